// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::time::Duration;

use crate::config::consts::DEFAULT_STEP_DELAY_MS;

/// Pacing policy between protocol steps.
///
/// Keeps the protocol state machine independent of wall-clock timing: production runs use
/// [`FixedDelay`], tests use [`NoDelay`].
#[async_trait]
pub trait Pacer: Send + Sync {
    /// Wait before executing the step at `step_index`.
    async fn pace(&self, step_index: usize);

    fn name(&self) -> &'static str;
}

/// Sleep for the same duration before every step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay(pub Duration);

impl Default for FixedDelay {
    fn default() -> Self {
        Self(Duration::from_millis(DEFAULT_STEP_DELAY_MS))
    }
}

#[async_trait]
impl Pacer for FixedDelay {
    async fn pace(&self, _step_index: usize) {
        tokio::time::sleep(self.0).await;
    }

    fn name(&self) -> &'static str {
        "fixed_delay"
    }
}

/// Execute steps back to back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoDelay;

#[async_trait]
impl Pacer for NoDelay {
    async fn pace(&self, _step_index: usize) {}

    fn name(&self) -> &'static str {
        "no_delay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_delay_default_is_non_zero() {
        assert_eq!(FixedDelay::default().0, Duration::from_millis(500));
    }

    #[test]
    fn test_pacer_names() {
        assert_eq!(FixedDelay::default().name(), "fixed_delay");
        assert_eq!(NoDelay.name(), "no_delay");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_waits() {
        let pacer = FixedDelay(Duration::from_secs(2));
        let start = tokio::time::Instant::now();
        pacer.pace(0).await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}
