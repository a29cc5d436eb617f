// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::errors::RegistrationError;
use crate::traits::handler::{same_handler, HandlerRef};

/// Subscription relation: event type tag -> handlers in registration order.
///
/// This is the only shared mutable state of the bus. Writers take the write lock briefly;
/// `snapshot` clones the handler list under the read lock so a publication never observes a
/// half-applied change.
#[derive(Default)]
pub(crate) struct SubscriptionTable {
    entries: RwLock<HashMap<String, Vec<HandlerRef>>>,
}

impl SubscriptionTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    // The table only holds plain data, so a poisoned lock is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Vec<HandlerRef>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Vec<HandlerRef>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a registration. Returns the new subscriber count for the tag.
    pub(crate) fn subscribe(&self, event_type: &str, handler: HandlerRef) -> Result<usize, RegistrationError> {
        validate_event_type(event_type)?;
        let mut entries = self.write();
        let handlers = entries.entry(event_type.to_string()).or_default();
        handlers.push(handler);
        Ok(handlers.len())
    }

    /// Remove the earliest registration of exactly this handler. Returns whether one was removed.
    pub(crate) fn unsubscribe(&self, event_type: &str, handler: &HandlerRef) -> bool {
        let mut entries = self.write();
        let Some(handlers) = entries.get_mut(event_type) else {
            return false;
        };

        let Some(position) = handlers.iter().position(|h| same_handler(h, handler)) else {
            return false;
        };

        handlers.remove(position);
        if handlers.is_empty() {
            entries.remove(event_type);
        }
        true
    }

    pub(crate) fn snapshot(&self, event_type: &str) -> Vec<HandlerRef> {
        self.read().get(event_type).cloned().unwrap_or_default()
    }

    pub(crate) fn count(&self, event_type: &str) -> usize {
        self.read().get(event_type).map_or(0, Vec::len)
    }

    pub(crate) fn event_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.read().keys().cloned().collect();
        types.sort();
        types
    }

    pub(crate) fn clear(&self) {
        self.write().clear();
    }
}

pub(crate) fn validate_event_type(event_type: &str) -> Result<(), RegistrationError> {
    if event_type.trim().is_empty() {
        return Err(RegistrationError::EmptyEventType);
    }
    if event_type.chars().any(char::is_whitespace) {
        return Err(RegistrationError::InvalidEventType(event_type.to_string()));
    }
    Ok(())
}
