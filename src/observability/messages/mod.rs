// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for the human-readable line and
//! [`StructuredLog`] to emit it at its intended level with structured fields.
//!
//! # Organization
//!
//! * `bus` - event channel and dispatcher events
//! * `crisis` - crisis classification and protocol execution events
//!
//! # Usage Pattern
//!
//! ```rust
//! use careline::observability::messages::{bus::HandlerSubscribed, StructuredLog};
//!
//! let msg = HandlerSubscribed {
//!     event_type: "symptom.observed",
//!     handler: "crisis_assessment",
//!     subscriber_count: 1,
//! };
//!
//! msg.log();
//! ```

pub mod bus;
pub mod crisis;

use tracing::Span;

/// A log message that knows its own level and structured fields.
pub trait StructuredLog {
    /// Emit the message at its intended level.
    fn log(&self);

    /// Build a span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}
