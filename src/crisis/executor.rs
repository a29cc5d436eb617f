// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Paced crisis protocol execution.
//!
//! One [`ProtocolExecutor::run`] drives a single protocol execution through
//!
//! ```text
//! Idle -> AlertPublished -> ExecutingStep(0) -> ... -> ExecutingStep(n-1) -> Completed
//!                       \-> Completed (empty protocol)
//! ```
//!
//! The alert is published before any step starts. Each step waits on the [`Pacer`], then
//! publishes its `crisis.step.executed` notification, so step `i + 1` is never announced
//! before step `i`. Cancelling the dispatch token while a step is being paced ends the run
//! in `Cancelled`. No events follow a terminal state.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::bus::{topics, EventBus};
use crate::crisis::protocol::ProtocolRegistry;
use crate::crisis::rules::{CrisisCategory, Observation};
use crate::errors::HandlerError;
use crate::observability::messages::crisis::{
    CrisisAlertRaised, ExecutionStateChanged, ProtocolFinished, ProtocolStepExecuted,
};
use crate::observability::messages::StructuredLog;
use crate::traits::Pacer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Idle,
    AlertPublished,
    ExecutingStep(usize),
    Completed,
    Cancelled,
}

impl ExecutionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionState::Completed | ExecutionState::Cancelled)
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionState::Idle => write!(f, "idle"),
            ExecutionState::AlertPublished => write!(f, "alert_published"),
            ExecutionState::ExecutingStep(index) => write!(f, "executing_step({})", index),
            ExecutionState::Completed => write!(f, "completed"),
            ExecutionState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Payload of a `crisis.alert` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrisisAlert {
    pub patient_id: String,
    pub category: CrisisCategory,
    pub message: String,
    pub severity: u8,
    pub timestamp: String,
    pub protocol: Vec<String>,
}

/// Payload of a `crisis.step.executed` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepExecuted {
    pub patient_id: String,
    pub category: CrisisCategory,
    pub step_index: usize,
    pub total_steps: usize,
    pub step: String,
}

/// Transient run record, owned by a single `run` call.
#[derive(Debug)]
struct ProtocolExecution {
    patient_id: String,
    category: CrisisCategory,
    steps_executed: usize,
    total_steps: usize,
    started_at: Instant,
    state: ExecutionState,
}

impl ProtocolExecution {
    fn new(patient_id: &str, category: CrisisCategory, total_steps: usize) -> Self {
        Self {
            patient_id: patient_id.to_string(),
            category,
            steps_executed: 0,
            total_steps,
            started_at: Instant::now(),
            state: ExecutionState::Idle,
        }
    }

    fn transition(&mut self, to: ExecutionState) {
        ExecutionStateChanged {
            patient_id: &self.patient_id,
            category: self.category.key(),
            from: &self.state.to_string(),
            to: &to.to_string(),
        }
        .log();
        self.state = to;
    }

    fn finish(mut self, terminal: ExecutionState, pacer: &str) -> ExecutionReport {
        self.transition(terminal);
        let report = ExecutionReport {
            patient_id: self.patient_id,
            category: self.category,
            steps_executed: self.steps_executed,
            total_steps: self.total_steps,
            final_state: self.state,
            duration: self.started_at.elapsed(),
        };

        ProtocolFinished {
            patient_id: &report.patient_id,
            category: report.category.key(),
            steps_executed: report.steps_executed,
            total_steps: report.total_steps,
            cancelled: report.final_state == ExecutionState::Cancelled,
            duration: report.duration,
            pacer,
        }
        .log();
        report
    }
}

/// Summary of a finished protocol execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub patient_id: String,
    pub category: CrisisCategory,
    pub steps_executed: usize,
    pub total_steps: usize,
    pub final_state: ExecutionState,
    pub duration: Duration,
}

impl ExecutionReport {
    pub fn completed(&self) -> bool {
        self.final_state == ExecutionState::Completed
    }
}

/// Announces confirmed crises and paces through their protocol.
///
/// Holds no per-run state, so one executor serves concurrent runs for any number of
/// patients, including overlapping runs for the same patient.
#[derive(Clone)]
pub struct ProtocolExecutor {
    bus: EventBus,
    registry: Arc<ProtocolRegistry>,
    pacer: Arc<dyn Pacer>,
}

impl ProtocolExecutor {
    pub fn new(bus: EventBus, registry: Arc<ProtocolRegistry>, pacer: Arc<dyn Pacer>) -> Self {
        Self { bus, registry, pacer }
    }

    pub async fn run(
        &self,
        observation: &Observation,
        category: CrisisCategory,
        cancellation: &CancellationToken,
    ) -> Result<ExecutionReport, HandlerError> {
        let steps = self.registry.steps_for(category).to_vec();
        let alert = CrisisAlert {
            patient_id: observation.patient_id.clone(),
            category,
            message: observation.message.clone(),
            severity: observation.severity,
            timestamp: observation
                .timestamp
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339()),
            protocol: steps,
        };

        let raised = CrisisAlertRaised {
            patient_id: &alert.patient_id,
            category: category.key(),
            severity: alert.severity,
            step_count: alert.protocol.len(),
        };
        let span = raised.span("protocol_execution");

        self.execute(alert, cancellation).instrument(span).await
    }

    async fn execute(&self, alert: CrisisAlert, cancellation: &CancellationToken) -> Result<ExecutionReport, HandlerError> {
        let mut execution = ProtocolExecution::new(&alert.patient_id, alert.category, alert.protocol.len());

        let payload = serde_json::to_value(&alert).map_err(anyhow::Error::from)?;
        self.bus.publish(topics::CRISIS_ALERT, payload);
        CrisisAlertRaised {
            patient_id: &alert.patient_id,
            category: alert.category.key(),
            severity: alert.severity,
            step_count: alert.protocol.len(),
        }
        .log();
        execution.transition(ExecutionState::AlertPublished);

        for (index, step) in alert.protocol.iter().enumerate() {
            execution.transition(ExecutionState::ExecutingStep(index));

            tokio::select! {
                biased;
                _ = cancellation.cancelled() => {
                    return Ok(execution.finish(ExecutionState::Cancelled, self.pacer.name()));
                }
                _ = self.pacer.pace(index) => {}
            }

            let notification = StepExecuted {
                patient_id: alert.patient_id.clone(),
                category: alert.category,
                step_index: index,
                total_steps: alert.protocol.len(),
                step: step.clone(),
            };
            let payload = serde_json::to_value(&notification).map_err(anyhow::Error::from)?;
            self.bus.publish(topics::CRISIS_STEP_EXECUTED, payload);
            execution.steps_executed += 1;

            ProtocolStepExecuted {
                patient_id: &alert.patient_id,
                step_index: index,
                total_steps: alert.protocol.len(),
                step,
            }
            .log();
        }

        Ok(execution.finish(ExecutionState::Completed, self.pacer.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::stub::RecordingHandler;
    use crate::traits::{FixedDelay, NoDelay};

    const WAIT: Duration = Duration::from_secs(2);

    fn observation(patient_id: &str, timestamp: Option<&str>) -> Observation {
        Observation {
            patient_id: patient_id.to_string(),
            message: "I feel hopeless".to_string(),
            severity: 6,
            timestamp: timestamp.map(str::to_string),
        }
    }

    fn executor(bus: &EventBus, registry: ProtocolRegistry, pacer: Arc<dyn Pacer>) -> ProtocolExecutor {
        ProtocolExecutor::new(bus.clone(), Arc::new(registry), pacer)
    }

    fn abc_registry() -> ProtocolRegistry {
        ProtocolRegistry::new([("suicide_risk", vec!["A", "B", "C"])])
    }

    #[tokio::test]
    async fn test_alert_precedes_ordered_steps() {
        let bus = EventBus::new();
        let trail = Arc::new(RecordingHandler::new("trail"));
        bus.subscribe(topics::CRISIS_ALERT, trail.clone()).unwrap();
        bus.subscribe(topics::CRISIS_STEP_EXECUTED, trail.clone()).unwrap();

        let report = executor(&bus, abc_registry(), Arc::new(NoDelay))
            .run(&observation("P001", None), CrisisCategory::SuicideRisk, &CancellationToken::new())
            .await
            .unwrap();

        assert!(report.completed());
        assert_eq!(report.steps_executed, 3);
        assert!(trail.wait_for(4, WAIT).await);

        let events = trail.events_by_sequence();
        assert_eq!(events[0].event_type, topics::CRISIS_ALERT);
        let alert: CrisisAlert = events[0].parse().unwrap();
        assert_eq!(alert.protocol, vec!["A", "B", "C"]);

        let steps: Vec<(usize, String)> = events[1..]
            .iter()
            .map(|e| {
                let step: StepExecuted = e.parse().unwrap();
                (step.step_index, step.step)
            })
            .collect();
        assert_eq!(
            steps,
            vec![(0, "A".to_string()), (1, "B".to_string()), (2, "C".to_string())]
        );
    }

    #[tokio::test]
    async fn test_empty_protocol_completes_without_steps() {
        let bus = EventBus::new();
        let trail = Arc::new(RecordingHandler::new("trail"));
        bus.subscribe(topics::CRISIS_ALERT, trail.clone()).unwrap();
        bus.subscribe(topics::CRISIS_STEP_EXECUTED, trail.clone()).unwrap();

        let report = executor(&bus, ProtocolRegistry::default(), Arc::new(NoDelay))
            .run(&observation("P002", None), CrisisCategory::SevereSymptoms, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.final_state, ExecutionState::Completed);
        assert_eq!(report.total_steps, 0);
        bus.drain().await;

        let events = trail.events();
        assert_eq!(events.len(), 1);
        let alert: CrisisAlert = events[0].parse().unwrap();
        assert!(alert.protocol.is_empty());
        assert_eq!(alert.category, CrisisCategory::SevereSymptoms);
    }

    #[tokio::test]
    async fn test_alert_keeps_observation_timestamp() {
        let bus = EventBus::new();
        let alerts = Arc::new(RecordingHandler::new("alerts"));
        bus.subscribe(topics::CRISIS_ALERT, alerts.clone()).unwrap();

        executor(&bus, abc_registry(), Arc::new(NoDelay))
            .run(
                &observation("P003", Some("2025-03-01T09:30:00Z")),
                CrisisCategory::SuicideRisk,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(alerts.wait_for(1, WAIT).await);

        let alert: CrisisAlert = alerts.events()[0].parse().unwrap();
        assert_eq!(alert.timestamp, "2025-03-01T09:30:00Z");
        assert_eq!(alert.message, "I feel hopeless");
        assert_eq!(alert.severity, 6);
    }

    #[tokio::test]
    async fn test_missing_timestamp_defaults_to_now() {
        let bus = EventBus::new();
        let alerts = Arc::new(RecordingHandler::new("alerts"));
        bus.subscribe(topics::CRISIS_ALERT, alerts.clone()).unwrap();

        executor(&bus, abc_registry(), Arc::new(NoDelay))
            .run(&observation("P004", None), CrisisCategory::SuicideRisk, &CancellationToken::new())
            .await
            .unwrap();
        assert!(alerts.wait_for(1, WAIT).await);

        let alert: CrisisAlert = alerts.events()[0].parse().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(&alert.timestamp).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_paces_each_step() {
        let bus = EventBus::new();
        let start = Instant::now();

        let report = executor(&bus, abc_registry(), Arc::new(FixedDelay(Duration::from_millis(500))))
            .run(&observation("P005", None), CrisisCategory::SuicideRisk, &CancellationToken::new())
            .await
            .unwrap();

        assert!(report.completed());
        assert!(start.elapsed() >= Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_during_pacing_stops_the_run() {
        let bus = EventBus::new();
        let steps = Arc::new(RecordingHandler::new("steps"));
        bus.subscribe(topics::CRISIS_STEP_EXECUTED, steps.clone()).unwrap();

        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(750)).await;
            canceller.cancel();
        });

        let report = executor(&bus, abc_registry(), Arc::new(FixedDelay(Duration::from_millis(500))))
            .run(&observation("P006", None), CrisisCategory::SuicideRisk, &token)
            .await
            .unwrap();

        assert_eq!(report.final_state, ExecutionState::Cancelled);
        assert_eq!(report.steps_executed, 1);
        bus.drain().await;
        assert_eq!(steps.count(), 1);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ExecutionState::ExecutingStep(2).to_string(), "executing_step(2)");
        assert!(ExecutionState::Cancelled.is_terminal());
        assert!(!ExecutionState::AlertPublished.is_terminal());
    }
}
