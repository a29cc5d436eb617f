// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

use crate::errors::HandlerError;

/// An immutable notification: a type tag plus an opaque payload.
///
/// Handlers receive events behind an `Arc`, so every handler of one publication observes the
/// same value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_type: String,
    pub payload: Value,
    /// Set on requests and their replies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,
    /// Monotonic publication order across the whole bus. Zero for events built outside a bus.
    pub sequence: u64,
    pub published_at: DateTime<Utc>,
}

impl Event {
    /// Build an event that has not gone through a bus.
    pub fn new(event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
            correlation_id: None,
            sequence: 0,
            published_at: Utc::now(),
        }
    }

    /// Deserialize the payload, reporting shape problems as a malformed payload.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        serde_json::from_value(self.payload.clone())
            .map_err(|e| HandlerError::malformed(&self.event_type, e))
    }

    pub fn is_request(&self) -> bool {
        self.correlation_id.is_some()
    }
}

/// Per-publication options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishOptions {
    /// Abort and report any handler still running after this long.
    /// `None` falls back to the bus default.
    pub deadline: Option<Duration>,
    pub correlation_id: Option<Uuid>,
}

impl PublishOptions {
    pub fn with_deadline(deadline: Duration) -> Self {
        Self {
            deadline: Some(deadline),
            ..Self::default()
        }
    }
}
