// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

use crate::bus::Event;
use crate::errors::HandlerError;
use crate::traits::{DispatchContext, EventHandler};

/// A handler that records every event it receives, for tests and demos
pub struct RecordingHandler {
    name: String,
    events: Mutex<Vec<Arc<Event>>>,
    notify: Notify,
}

impl RecordingHandler {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            events: Mutex::new(Vec::new()),
            notify: Notify::new(),
        }
    }

    /// Events received so far, in arrival order.
    pub fn events(&self) -> Vec<Arc<Event>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Events received so far, in publication order.
    pub fn events_by_sequence(&self) -> Vec<Arc<Event>> {
        let mut events = self.events();
        events.sort_by_key(|e| e.sequence);
        events
    }

    pub fn count(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Wait until at least `count` events arrived. Returns `false` on timeout.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                let notified = self.notify.notified();
                if self.count() >= count {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn handle(&self, event: Arc<Event>, _ctx: DispatchContext) -> Result<(), HandlerError> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event);
        self.notify.notify_waiters();
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A handler that always fails for testing failure isolation
pub struct FailingHandler {
    name: String,
    attempts: AtomicUsize,
}

impl FailingHandler {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventHandler for FailingHandler {
    async fn handle(&self, _event: Arc<Event>, _ctx: DispatchContext) -> Result<(), HandlerError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(anyhow::anyhow!("simulated handler failure").into())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A handler that panics for testing panic containment
pub struct PanickingHandler {
    name: String,
}

impl PanickingHandler {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string() }
    }
}

#[async_trait]
impl EventHandler for PanickingHandler {
    async fn handle(&self, _event: Arc<Event>, _ctx: DispatchContext) -> Result<(), HandlerError> {
        panic!("simulated handler panic");
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A handler that sleeps before succeeding, for deadline and cancellation tests
pub struct SlowHandler {
    name: String,
    delay: Duration,
    completed: AtomicUsize,
}

impl SlowHandler {
    pub fn new(name: &str, delay: Duration) -> Self {
        Self {
            name: name.to_string(),
            delay,
            completed: AtomicUsize::new(0),
        }
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventHandler for SlowHandler {
    async fn handle(&self, _event: Arc<Event>, _ctx: DispatchContext) -> Result<(), HandlerError> {
        tokio::time::sleep(self.delay).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
