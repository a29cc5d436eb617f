// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Request/reply on top of the fire-and-forget channel.
//!
//! `publish` never returns handler results. Callers that need a value back send a request
//! carrying a fresh correlation id and wait for the first reply published on
//! `<tag>.reply` with the same id.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::bus::{topics, Event, EventBus, PublishOptions};
use crate::errors::RequestError;
use crate::observability::messages::bus::{RequestSent, RequestTimedOut, UnclaimedReply};
use crate::observability::messages::StructuredLog;

/// Requests waiting for their reply, keyed by correlation id.
#[derive(Default)]
pub(crate) struct PendingReplies {
    waiting: Mutex<HashMap<Uuid, oneshot::Sender<Event>>>,
}

impl PendingReplies {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, oneshot::Sender<Event>>> {
        self.waiting.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn register(&self, correlation_id: Uuid) -> oneshot::Receiver<Event> {
        let (sender, receiver) = oneshot::channel();
        self.lock().insert(correlation_id, sender);
        receiver
    }

    /// Hand `reply` to the waiting requester. Returns `false` when nobody is waiting.
    pub(crate) fn complete(&self, correlation_id: Uuid, reply: Event) -> bool {
        match self.lock().remove(&correlation_id) {
            Some(sender) => sender.send(reply).is_ok(),
            None => false,
        }
    }

    pub(crate) fn forget(&self, correlation_id: &Uuid) {
        self.lock().remove(correlation_id);
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    pub(crate) fn clear(&self) {
        self.lock().clear();
    }
}

/// Removes a pending entry when its request ends without a reply, including when the
/// request future is dropped before it resolves.
struct PendingGuard<'a> {
    pending: &'a PendingReplies,
    correlation_id: Uuid,
    armed: bool,
}

impl<'a> PendingGuard<'a> {
    fn new(pending: &'a PendingReplies, correlation_id: Uuid) -> Self {
        Self {
            pending,
            correlation_id,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.pending.forget(&self.correlation_id);
        }
    }
}

impl EventBus {
    /// Publish `payload` as a request and wait up to `timeout` for the first reply.
    pub async fn request(&self, event_type: &str, payload: Value, timeout: Duration) -> Result<Event, RequestError> {
        let correlation_id = Uuid::new_v4();
        let correlation = correlation_id.to_string();
        let receiver = self.pending().register(correlation_id);
        let mut guard = PendingGuard::new(self.pending(), correlation_id);

        RequestSent {
            event_type,
            correlation_id: &correlation,
            timeout,
        }
        .log();

        let options = PublishOptions {
            correlation_id: Some(correlation_id),
            ..PublishOptions::default()
        };
        if self.publish_with(event_type, payload, options) == 0 {
            return Err(RequestError::NoResponder(event_type.to_string()));
        }

        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(reply)) => {
                guard.disarm();
                Ok(reply)
            }
            Ok(Err(_)) => Err(RequestError::Abandoned(event_type.to_string())),
            Err(_) => {
                RequestTimedOut {
                    event_type,
                    correlation_id: &correlation,
                    timeout,
                }
                .log();
                Err(RequestError::TimedOut {
                    event_type: event_type.to_string(),
                    timeout,
                })
            }
        }
    }

    /// Answer `request`. The reply is delivered to the waiting requester and also published
    /// on `<tag>.reply` for any observers.
    pub fn respond(&self, request: &Event, payload: Value) -> Result<(), RequestError> {
        let correlation_id = request
            .correlation_id
            .ok_or_else(|| RequestError::NotARequest(request.event_type.clone()))?;

        let reply_type = topics::reply_to(&request.event_type);
        let reply = self.stamp(&reply_type, payload, Some(correlation_id));

        if !self.pending().complete(correlation_id, reply.clone()) {
            UnclaimedReply {
                event_type: &reply_type,
                correlation_id: &correlation_id.to_string(),
            }
            .log();
        }

        self.dispatch(Arc::new(reply), None);
        Ok(())
    }

    /// Number of requests still waiting for a reply.
    pub fn pending_requests(&self) -> usize {
        self.pending().len()
    }
}
