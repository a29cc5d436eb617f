// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised by the event bus and by the handlers it dispatches.
//!
//! The bus distinguishes between what a handler *returns* ([`HandlerError`]) and what the
//! dispatcher *observes* about a handler run ([`HandlerFailure`]). Only
//! [`RegistrationError`] and [`RequestError`] ever reach a caller synchronously; handler
//! failures are reported through logs and the `bus.handler.failed` diagnostic event.

use std::time::Duration;
use thiserror::Error;

/// Rejected `subscribe` call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The event type tag was empty or blank.
    #[error("event type tag must not be empty")]
    EmptyEventType,

    /// The event type tag contained whitespace.
    #[error("event type tag '{0}' must not contain whitespace")]
    InvalidEventType(String),

    /// The bus has been shut down and accepts no new subscriptions.
    #[error("cannot subscribe to '{0}': the bus has been shut down")]
    ShutDown(String),
}

/// Error returned by an [`EventHandler`](crate::traits::EventHandler).
#[derive(Error, Debug)]
pub enum HandlerError {
    /// The payload was missing required fields or carried values of the wrong shape.
    #[error("malformed '{event_type}' payload: {reason}")]
    MalformedPayload { event_type: String, reason: String },

    /// Any other failure inside a handler.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn malformed(event_type: impl Into<String>, reason: impl ToString) -> Self {
        HandlerError::MalformedPayload {
            event_type: event_type.into(),
            reason: reason.to_string(),
        }
    }
}

/// Outcome of a supervised handler run that did not end in `Ok(())`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerFailure {
    /// The handler returned an error.
    #[error("handler '{handler}' failed on '{event_type}': {reason}")]
    Returned {
        handler: String,
        event_type: String,
        reason: String,
    },

    /// The handler panicked.
    #[error("handler '{handler}' panicked on '{event_type}': {reason}")]
    Panicked {
        handler: String,
        event_type: String,
        reason: String,
    },

    /// The handler outlived the deadline of its publication and was aborted.
    #[error("handler '{handler}' exceeded its {deadline:?} deadline on '{event_type}'")]
    TimedOut {
        handler: String,
        event_type: String,
        deadline: Duration,
    },

    /// The bus was shut down while the handler was still running.
    #[error("handler '{handler}' was cancelled while handling '{event_type}'")]
    Cancelled { handler: String, event_type: String },
}

impl HandlerFailure {
    pub fn handler(&self) -> &str {
        match self {
            HandlerFailure::Returned { handler, .. }
            | HandlerFailure::Panicked { handler, .. }
            | HandlerFailure::TimedOut { handler, .. }
            | HandlerFailure::Cancelled { handler, .. } => handler,
        }
    }

    pub fn event_type(&self) -> &str {
        match self {
            HandlerFailure::Returned { event_type, .. }
            | HandlerFailure::Panicked { event_type, .. }
            | HandlerFailure::TimedOut { event_type, .. }
            | HandlerFailure::Cancelled { event_type, .. } => event_type,
        }
    }

    /// Stable short name used in the diagnostic event payload.
    pub fn kind(&self) -> &'static str {
        match self {
            HandlerFailure::Returned { .. } => "returned",
            HandlerFailure::Panicked { .. } => "panicked",
            HandlerFailure::TimedOut { .. } => "timed_out",
            HandlerFailure::Cancelled { .. } => "cancelled",
        }
    }
}

/// Failure of the request/reply interface.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// Nobody was subscribed to the request tag when it was published.
    #[error("no responder subscribed to '{0}'")]
    NoResponder(String),

    /// No reply arrived in time.
    #[error("no reply to '{event_type}' within {timeout:?}")]
    TimedOut { event_type: String, timeout: Duration },

    /// `respond` was called with an event that carries no correlation id.
    #[error("event '{0}' carries no correlation id and cannot be answered")]
    NotARequest(String),

    /// The pending request was dropped before a reply arrived, e.g. on shutdown.
    #[error("request '{0}' was abandoned before a reply arrived")]
    Abandoned(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_failure_accessors() {
        let failure = HandlerFailure::TimedOut {
            handler: "notifier".to_string(),
            event_type: "crisis.alert".to_string(),
            deadline: Duration::from_millis(50),
        };

        assert_eq!(failure.handler(), "notifier");
        assert_eq!(failure.event_type(), "crisis.alert");
        assert_eq!(failure.kind(), "timed_out");
        assert!(failure.to_string().contains("50ms"));
    }

    #[test]
    fn test_malformed_payload_message() {
        let error = HandlerError::malformed("symptom.observed", "missing field `severity`");
        assert_eq!(
            error.to_string(),
            "malformed 'symptom.observed' payload: missing field `severity`"
        );
    }

    #[test]
    fn test_anyhow_errors_convert_into_handler_errors() {
        let error: HandlerError = anyhow::anyhow!("pager unreachable").into();
        assert!(matches!(error, HandlerError::Failed(_)));
        assert_eq!(error.to_string(), "pager unreachable");
    }
}
