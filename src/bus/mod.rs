// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-process publish/subscribe coordination.
//!
//! Functional units never call each other directly; they publish [`Event`]s on an
//! [`EventBus`] and subscribe [`EventHandler`](crate::traits::EventHandler)s to the tags
//! they care about.
//!
//! ## Dispatch contract
//!
//! - `publish` snapshots the handlers registered for the tag at call time, spawns one
//!   supervised task per handler and returns without waiting for any of them.
//! - Handlers of one publication run concurrently; their relative order is unspecified.
//!   Use [`Event::sequence`] to reason about publication order.
//! - A failing, panicking, timed-out or cancelled handler never affects its siblings or the
//!   publisher. Every such outcome is logged and re-published as a
//!   [`topics::HANDLER_FAILED`] diagnostic event.
//! - Callers that need a value back use [`EventBus::request`] / [`EventBus::respond`]
//!   instead of inspecting `publish`.

mod channel;
mod dispatcher;
mod event;
mod event_bus;
mod request;
pub mod stub;
pub mod topics;

pub use event::{Event, PublishOptions};
pub use event_bus::EventBus;
