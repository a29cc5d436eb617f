// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the event channel and dispatcher.
//!
//! This module contains message types for logging events related to:
//! * Subscription changes
//! * Event publication and handler dispatch
//! * Handler failures
//! * Request/reply correlation

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Handler registered for an event type.
///
/// # Log Level
/// `debug!` - Wiring detail
pub struct HandlerSubscribed<'a> {
    pub event_type: &'a str,
    pub handler: &'a str,
    pub subscriber_count: usize,
}

impl Display for HandlerSubscribed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Handler '{}' subscribed to '{}' ({} subscribers)",
            self.handler, self.event_type, self.subscriber_count
        )
    }
}

impl StructuredLog for HandlerSubscribed<'_> {
    fn log(&self) {
        tracing::debug!(
            event_type = self.event_type,
            handler = self.handler,
            subscriber_count = self.subscriber_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "subscription",
            span_name = name,
            event_type = self.event_type,
            handler = self.handler,
        )
    }
}

/// Handler removed from an event type.
///
/// # Log Level
/// `debug!` - Wiring detail
pub struct HandlerUnsubscribed<'a> {
    pub event_type: &'a str,
    pub handler: &'a str,
    pub removed: bool,
}

impl Display for HandlerUnsubscribed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.removed {
            write!(f, "Handler '{}' unsubscribed from '{}'", self.handler, self.event_type)
        } else {
            write!(
                f,
                "Handler '{}' was not subscribed to '{}', nothing removed",
                self.handler, self.event_type
            )
        }
    }
}

impl StructuredLog for HandlerUnsubscribed<'_> {
    fn log(&self) {
        tracing::debug!(
            event_type = self.event_type,
            handler = self.handler,
            removed = self.removed,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "subscription",
            span_name = name,
            event_type = self.event_type,
            handler = self.handler,
        )
    }
}

/// Event published and fanned out to its current subscribers.
///
/// # Log Level
/// `debug!` - High-volume operational detail
///
/// # Example
/// ```
/// use careline::observability::messages::bus::EventPublished;
///
/// let msg = EventPublished {
///     event_type: "crisis.alert",
///     sequence: 42,
///     handler_count: 3,
/// };
///
/// assert_eq!(msg.to_string(), "Event 'crisis.alert' #42 dispatched to 3 handlers");
/// ```
pub struct EventPublished<'a> {
    pub event_type: &'a str,
    pub sequence: u64,
    pub handler_count: usize,
}

impl Display for EventPublished<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Event '{}' #{} dispatched to {} handlers",
            self.event_type, self.sequence, self.handler_count
        )
    }
}

impl StructuredLog for EventPublished<'_> {
    fn log(&self) {
        if self.handler_count == 0 {
            tracing::trace!(
                event_type = self.event_type,
                sequence = self.sequence,
                handler_count = self.handler_count,
                "{}", self
            );
        } else {
            tracing::debug!(
                event_type = self.event_type,
                sequence = self.sequence,
                handler_count = self.handler_count,
                "{}", self
            );
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "dispatch",
            span_name = name,
            event_type = self.event_type,
            sequence = self.sequence,
        )
    }
}

/// A handler run that ended in anything other than success.
///
/// # Log Level
/// `error!` - Failure requiring operator attention
pub struct HandlerFailed<'a> {
    pub event_type: &'a str,
    pub handler: &'a str,
    pub kind: &'a str,
    pub sequence: u64,
    pub error: &'a dyn std::error::Error,
}

impl Display for HandlerFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Handler failure on event #{}: {}", self.sequence, self.error)
    }
}

impl StructuredLog for HandlerFailed<'_> {
    fn log(&self) {
        tracing::error!(
            event_type = self.event_type,
            handler = self.handler,
            kind = self.kind,
            sequence = self.sequence,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "handler_failure",
            span_name = name,
            event_type = self.event_type,
            handler = self.handler,
            kind = self.kind,
        )
    }
}

/// Request published and awaiting its reply.
///
/// # Log Level
/// `debug!` - Operational detail
pub struct RequestSent<'a> {
    pub event_type: &'a str,
    pub correlation_id: &'a str,
    pub timeout: Duration,
}

impl Display for RequestSent<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Request '{}' [{}] sent, waiting up to {:?} for a reply",
            self.event_type, self.correlation_id, self.timeout
        )
    }
}

impl StructuredLog for RequestSent<'_> {
    fn log(&self) {
        tracing::debug!(
            event_type = self.event_type,
            correlation_id = self.correlation_id,
            timeout_ms = self.timeout.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "request",
            span_name = name,
            event_type = self.event_type,
            correlation_id = self.correlation_id,
        )
    }
}

/// Request gave up waiting.
///
/// # Log Level
/// `warn!` - The caller continues without an answer
pub struct RequestTimedOut<'a> {
    pub event_type: &'a str,
    pub correlation_id: &'a str,
    pub timeout: Duration,
}

impl Display for RequestTimedOut<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Request '{}' [{}] received no reply within {:?}",
            self.event_type, self.correlation_id, self.timeout
        )
    }
}

impl StructuredLog for RequestTimedOut<'_> {
    fn log(&self) {
        tracing::warn!(
            event_type = self.event_type,
            correlation_id = self.correlation_id,
            timeout_ms = self.timeout.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "request",
            span_name = name,
            event_type = self.event_type,
            correlation_id = self.correlation_id,
        )
    }
}

/// A reply arrived for a request nobody is waiting on anymore.
///
/// # Log Level
/// `debug!` - Expected after timeouts or when a second responder answers
pub struct UnclaimedReply<'a> {
    pub event_type: &'a str,
    pub correlation_id: &'a str,
}

impl Display for UnclaimedReply<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Reply '{}' [{}] has no pending request",
            self.event_type, self.correlation_id
        )
    }
}

impl StructuredLog for UnclaimedReply<'_> {
    fn log(&self) {
        tracing::debug!(
            event_type = self.event_type,
            correlation_id = self.correlation_id,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "reply",
            span_name = name,
            event_type = self.event_type,
            correlation_id = self.correlation_id,
        )
    }
}

/// Bus torn down.
///
/// # Log Level
/// `info!` - Lifecycle event
pub struct BusShutdown {
    pub in_flight: usize,
}

impl Display for BusShutdown {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Event bus shutting down with {} handler runs in flight", self.in_flight)
    }
}

impl StructuredLog for BusShutdown {
    fn log(&self) {
        tracing::info!(in_flight = self.in_flight, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("shutdown", span_name = name, in_flight = self.in_flight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsubscribe_message_reflects_outcome() {
        let removed = HandlerUnsubscribed {
            event_type: "crisis.alert",
            handler: "pager",
            removed: true,
        };
        let missing = HandlerUnsubscribed {
            event_type: "crisis.alert",
            handler: "pager",
            removed: false,
        };

        assert_eq!(removed.to_string(), "Handler 'pager' unsubscribed from 'crisis.alert'");
        assert!(missing.to_string().contains("nothing removed"));
    }

    #[test]
    fn test_handler_failed_includes_error_text() {
        let error = std::io::Error::new(std::io::ErrorKind::Other, "pager offline");
        let msg = HandlerFailed {
            event_type: "crisis.alert",
            handler: "pager",
            kind: "returned",
            sequence: 7,
            error: &error,
        };

        assert_eq!(msg.to_string(), "Handler failure on event #7: pager offline");
    }
}
