// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::bus::Event;
use crate::errors::HandlerFailure;
use crate::traits::{DispatchContext, HandlerRef};

/// Run one handler for one event and classify how it ended.
///
/// The handler runs in its own task so a panic is contained to that task and a deadline
/// can abort it. The supervisor resolves on whichever comes first: the handler finishing,
/// the deadline elapsing, or `cancellation` firing.
pub(crate) async fn supervise(
    handler: HandlerRef,
    event: Arc<Event>,
    deadline: Option<Duration>,
    cancellation: CancellationToken,
) -> Result<(), HandlerFailure> {
    let handler_name = handler.name().to_string();
    let event_type = event.event_type.clone();

    let ctx = DispatchContext::new(cancellation.clone(), deadline.map(|d| Instant::now() + d));
    let mut task = tokio::spawn(async move { handler.handle(event, ctx).await });

    let expiry = async {
        match deadline {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;

        joined = &mut task => match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(HandlerFailure::Returned {
                handler: handler_name,
                event_type,
                reason: error.to_string(),
            }),
            Err(join_error) if join_error.is_panic() => Err(HandlerFailure::Panicked {
                handler: handler_name,
                event_type,
                reason: panic_message(join_error.into_panic()),
            }),
            Err(_) => Err(HandlerFailure::Cancelled {
                handler: handler_name,
                event_type,
            }),
        },

        _ = cancellation.cancelled() => {
            task.abort();
            Err(HandlerFailure::Cancelled {
                handler: handler_name,
                event_type,
            })
        }

        _ = expiry => {
            cancellation.cancel();
            task.abort();
            Err(HandlerFailure::TimedOut {
                handler: handler_name,
                event_type,
                deadline: deadline.unwrap_or_default(),
            })
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
