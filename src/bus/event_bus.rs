// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use chrono::Utc;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;
use uuid::Uuid;

use crate::bus::channel::SubscriptionTable;
use crate::bus::dispatcher;
use crate::bus::request::PendingReplies;
use crate::bus::{topics, Event, PublishOptions};
use crate::config::BusConfig;
use crate::errors::{HandlerFailure, RegistrationError};
use crate::observability::messages::bus::{
    BusShutdown, EventPublished, HandlerFailed, HandlerSubscribed, HandlerUnsubscribed,
};
use crate::observability::messages::StructuredLog;
use crate::traits::HandlerRef;

/// Handle to an in-memory publish/subscribe channel.
///
/// Cloning is cheap and every clone talks to the same channel. There is no global
/// instance: components receive their handle at construction.
///
/// `publish` spawns tokio tasks and must be called from within a tokio runtime.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

struct BusInner {
    subscriptions: SubscriptionTable,
    pending: PendingReplies,
    tracker: TaskTracker,
    shutdown: CancellationToken,
    drain_lock: tokio::sync::Mutex<()>,
    sequence: AtomicU64,
    default_deadline: Option<Duration>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_default_deadline(None)
    }

    /// Bus whose publications abort handlers still running after `deadline` unless the
    /// publisher asks for a different one.
    pub fn with_default_deadline(deadline: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(BusInner {
                subscriptions: SubscriptionTable::new(),
                pending: PendingReplies::new(),
                tracker: TaskTracker::new(),
                shutdown: CancellationToken::new(),
                drain_lock: tokio::sync::Mutex::new(()),
                sequence: AtomicU64::new(1),
                default_deadline: deadline,
            }),
        }
    }

    pub fn from_config(config: &BusConfig) -> Self {
        Self::with_default_deadline(config.handler_deadline())
    }

    /// Register `handler` for future publications of `event_type`.
    ///
    /// Registering the same handler twice yields two invocations per publish. A bus that has
    /// been shut down rejects every registration.
    pub fn subscribe(&self, event_type: &str, handler: HandlerRef) -> Result<(), RegistrationError> {
        if self.is_shut_down() {
            return Err(RegistrationError::ShutDown(event_type.to_string()));
        }
        let name = handler.name().to_string();
        let subscriber_count = self.inner.subscriptions.subscribe(event_type, handler)?;

        HandlerSubscribed {
            event_type,
            handler: &name,
            subscriber_count,
        }
        .log();
        Ok(())
    }

    /// Remove one registration of exactly this handler.
    ///
    /// Removing a handler that is not registered is not an error; the return value tells
    /// whether anything was removed.
    pub fn unsubscribe(&self, event_type: &str, handler: &HandlerRef) -> bool {
        let removed = self.inner.subscriptions.unsubscribe(event_type, handler);

        HandlerUnsubscribed {
            event_type,
            handler: handler.name(),
            removed,
        }
        .log();
        removed
    }

    pub fn subscriber_count(&self, event_type: &str) -> usize {
        self.inner.subscriptions.count(event_type)
    }

    /// Event type tags that currently have at least one subscriber, sorted.
    pub fn event_types(&self) -> Vec<String> {
        self.inner.subscriptions.event_types()
    }

    /// Fire-and-forget publication. Returns the number of handlers scheduled.
    pub fn publish(&self, event_type: &str, payload: Value) -> usize {
        self.publish_with(event_type, payload, PublishOptions::default())
    }

    pub fn publish_with(&self, event_type: &str, payload: Value, options: PublishOptions) -> usize {
        let event = self.stamp(event_type, payload, options.correlation_id);
        self.dispatch(Arc::new(event), options.deadline)
    }

    /// Number of supervised handler runs that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.inner.tracker.len()
    }

    /// Wait until every handler run, including runs scheduled by other handlers in the
    /// meantime, has finished.
    ///
    /// Concurrent callers are served one at a time, since each one closes and reopens the
    /// shared tracker.
    pub async fn drain(&self) {
        let _serialized = self.inner.drain_lock.lock().await;
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        self.inner.tracker.reopen();
    }

    /// Tear the channel down: cancel every in-flight handler run, drop all subscriptions
    /// and abandon pending requests. Later publications schedule nothing and later
    /// subscriptions are rejected.
    pub fn shutdown(&self) {
        BusShutdown {
            in_flight: self.in_flight(),
        }
        .log();

        self.inner.shutdown.cancel();
        self.inner.subscriptions.clear();
        self.inner.pending.clear();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    pub(super) fn pending(&self) -> &PendingReplies {
        &self.inner.pending
    }

    pub(super) fn stamp(&self, event_type: &str, payload: Value, correlation_id: Option<Uuid>) -> Event {
        Event {
            event_type: event_type.to_string(),
            payload,
            correlation_id,
            sequence: self.inner.sequence.fetch_add(1, Ordering::SeqCst),
            published_at: Utc::now(),
        }
    }

    /// Schedule every handler currently subscribed to the event's tag.
    pub(super) fn dispatch(&self, event: Arc<Event>, deadline: Option<Duration>) -> usize {
        let handlers = if self.is_shut_down() {
            Vec::new()
        } else {
            self.inner.subscriptions.snapshot(&event.event_type)
        };
        let published = EventPublished {
            event_type: &event.event_type,
            sequence: event.sequence,
            handler_count: handlers.len(),
        };
        published.log();

        if handlers.is_empty() {
            return 0;
        }

        let deadline = deadline.or(self.inner.default_deadline);
        let dispatch_token = self.inner.shutdown.child_token();
        let span = published.span("publish");
        let scheduled = handlers.len();

        for handler in handlers {
            let bus = self.clone();
            let event = event.clone();
            let token = dispatch_token.child_token();

            self.inner.tracker.spawn(
                async move {
                    if let Err(failure) = dispatcher::supervise(handler, event.clone(), deadline, token).await {
                        bus.report_failure(&failure, &event);
                    }
                }
                .instrument(span.clone()),
            );
        }

        scheduled
    }

    fn report_failure(&self, failure: &HandlerFailure, event: &Event) {
        HandlerFailed {
            event_type: failure.event_type(),
            handler: failure.handler(),
            kind: failure.kind(),
            sequence: event.sequence,
            error: failure,
        }
        .log();

        // Failures of diagnostic handlers are only logged.
        if event.event_type == topics::HANDLER_FAILED {
            return;
        }

        self.publish(
            topics::HANDLER_FAILED,
            json!({
                "event_type": failure.event_type(),
                "handler": failure.handler(),
                "kind": failure.kind(),
                "reason": failure.to_string(),
                "sequence": event.sequence,
            }),
        );
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("event_types", &self.event_types())
            .field("in_flight", &self.in_flight())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}
