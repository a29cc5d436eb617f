// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::bus::Event;
use crate::errors::HandlerError;

/// Shared reference to a registered handler. Identity is pointer identity.
pub type HandlerRef = Arc<dyn EventHandler>;

/// Per-invocation context handed to a handler by the dispatcher.
///
/// Long-running handlers should watch [`cancellation`](Self::cancellation) so they stop
/// promptly when the bus shuts down or their publication's deadline expires.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    cancellation: CancellationToken,
    deadline: Option<Instant>,
}

impl DispatchContext {
    pub fn new(cancellation: CancellationToken, deadline: Option<Instant>) -> Self {
        Self {
            cancellation,
            deadline,
        }
    }

    /// Context for calling a handler directly, outside any dispatch.
    pub fn detached() -> Self {
        Self::new(CancellationToken::new(), None)
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// A unit of work run for every publication of the event types it is subscribed to.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: Arc<Event>, ctx: DispatchContext) -> Result<(), HandlerError>;

    fn name(&self) -> &str;
}

/// Adapter turning an async closure into an [`EventHandler`].
///
/// ```
/// use careline::errors::HandlerError;
/// use careline::traits::{EventHandler, FnHandler};
///
/// let handler = FnHandler::new("audit_trail", |event, _ctx| async move {
///     tracing::info!(event_type = %event.event_type, "audited");
///     Ok::<(), HandlerError>(())
/// });
///
/// assert_eq!(handler.name(), "audit_trail");
/// ```
pub struct FnHandler<F> {
    name: String,
    func: F,
}

impl<F, Fut> FnHandler<F>
where
    F: Fn(Arc<Event>, DispatchContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }

    /// Build the handler and wrap it for registration.
    pub fn shared(name: impl Into<String>, func: F) -> HandlerRef {
        Arc::new(Self::new(name, func))
    }
}

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(Arc<Event>, DispatchContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, event: Arc<Event>, ctx: DispatchContext) -> Result<(), HandlerError> {
        (self.func)(event, ctx).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Whether two handler references point at the same handler instance.
pub(crate) fn same_handler(a: &HandlerRef, b: &HandlerRef) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_fn_handler_invokes_closure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handler = FnHandler::new("counter", move |_event, _ctx| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), HandlerError>(())
            }
        });

        let event = Arc::new(Event::new("symptom.observed", json!({})));
        handler.handle(event.clone(), DispatchContext::detached()).await.unwrap();
        handler.handle(event, DispatchContext::detached()).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(handler.name(), "counter");
    }

    #[test]
    fn test_same_handler_uses_pointer_identity() {
        let a = FnHandler::shared("a", |_event, _ctx| async { Ok::<(), HandlerError>(()) });
        let a_clone = a.clone();
        let b = FnHandler::shared("a", |_event, _ctx| async { Ok::<(), HandlerError>(()) });

        assert!(same_handler(&a, &a_clone));
        assert!(!same_handler(&a, &b));
    }

    #[test]
    fn test_detached_context_is_live() {
        let ctx = DispatchContext::detached();
        assert!(!ctx.is_cancelled());
        assert!(ctx.deadline().is_none());

        ctx.cancellation().cancel();
        assert!(ctx.is_cancelled());
    }
}
