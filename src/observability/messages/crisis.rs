// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for crisis classification and protocol execution.
//!
//! This module contains message types for logging events related to:
//! * Observation classification
//! * Crisis alerts and protocol step progress
//! * Protocol registry fallbacks
//! * Clinician responses

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Observation evaluated against the crisis rules.
///
/// # Log Level
/// `debug!` - Emitted for every observation, crisis or not
pub struct ObservationClassified<'a> {
    pub patient_id: &'a str,
    pub severity: u8,
    pub is_crisis: bool,
    pub category: Option<&'a str>,
}

impl Display for ObservationClassified<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Observation for patient {} (severity {}) classified: crisis={}, category={}",
            self.patient_id,
            self.severity,
            self.is_crisis,
            self.category.unwrap_or("none")
        )
    }
}

impl StructuredLog for ObservationClassified<'_> {
    fn log(&self) {
        tracing::debug!(
            patient_id = self.patient_id,
            severity = self.severity,
            is_crisis = self.is_crisis,
            category = self.category.unwrap_or("none"),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "classification",
            span_name = name,
            patient_id = self.patient_id,
            severity = self.severity,
        )
    }
}

/// Crisis confirmed and alert published.
///
/// # Log Level
/// `warn!` - Clinically significant event
///
/// # Example
/// ```
/// use careline::observability::messages::crisis::CrisisAlertRaised;
///
/// let msg = CrisisAlertRaised {
///     patient_id: "P001",
///     category: "suicide_risk",
///     severity: 9,
///     step_count: 4,
/// };
///
/// assert_eq!(
///     msg.to_string(),
///     "CRISIS ALERT for patient P001: suicide_risk (severity 9), 4 protocol steps"
/// );
/// ```
pub struct CrisisAlertRaised<'a> {
    pub patient_id: &'a str,
    pub category: &'a str,
    pub severity: u8,
    pub step_count: usize,
}

impl Display for CrisisAlertRaised<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "CRISIS ALERT for patient {}: {} (severity {}), {} protocol steps",
            self.patient_id, self.category, self.severity, self.step_count
        )
    }
}

impl StructuredLog for CrisisAlertRaised<'_> {
    fn log(&self) {
        tracing::warn!(
            patient_id = self.patient_id,
            category = self.category,
            severity = self.severity,
            step_count = self.step_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "crisis_protocol",
            span_name = name,
            patient_id = self.patient_id,
            category = self.category,
        )
    }
}

/// Protocol run moved to a new state.
///
/// # Log Level
/// `debug!` - State machine trace
pub struct ExecutionStateChanged<'a> {
    pub patient_id: &'a str,
    pub category: &'a str,
    pub from: &'a str,
    pub to: &'a str,
}

impl Display for ExecutionStateChanged<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Protocol {} for patient {}: {} -> {}",
            self.category, self.patient_id, self.from, self.to
        )
    }
}

impl StructuredLog for ExecutionStateChanged<'_> {
    fn log(&self) {
        tracing::debug!(
            patient_id = self.patient_id,
            category = self.category,
            from = self.from,
            to = self.to,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "state_transition",
            span_name = name,
            patient_id = self.patient_id,
            category = self.category,
        )
    }
}

/// Remediation step executed.
///
/// # Log Level
/// `info!` - Progress of a crisis protocol
pub struct ProtocolStepExecuted<'a> {
    pub patient_id: &'a str,
    pub step_index: usize,
    pub total_steps: usize,
    pub step: &'a str,
}

impl Display for ProtocolStepExecuted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Executed step {}/{} for patient {}: {}",
            self.step_index + 1,
            self.total_steps,
            self.patient_id,
            self.step
        )
    }
}

impl StructuredLog for ProtocolStepExecuted<'_> {
    fn log(&self) {
        tracing::info!(
            patient_id = self.patient_id,
            step_index = self.step_index,
            total_steps = self.total_steps,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "protocol_step",
            span_name = name,
            patient_id = self.patient_id,
            step_index = self.step_index,
        )
    }
}

/// Protocol run finished, either completed or cancelled.
///
/// # Log Level
/// `info!` when completed, `warn!` when cancelled
pub struct ProtocolFinished<'a> {
    pub patient_id: &'a str,
    pub category: &'a str,
    pub steps_executed: usize,
    pub total_steps: usize,
    pub cancelled: bool,
    pub duration: Duration,
    pub pacer: &'a str,
}

impl Display for ProtocolFinished<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let outcome = if self.cancelled { "cancelled" } else { "completed" };
        write!(
            f,
            "Crisis protocol {} {} for patient {}: {}/{} steps in {:?}",
            self.category, outcome, self.patient_id, self.steps_executed, self.total_steps, self.duration
        )
    }
}

impl StructuredLog for ProtocolFinished<'_> {
    fn log(&self) {
        if self.cancelled {
            tracing::warn!(
                patient_id = self.patient_id,
                category = self.category,
                steps_executed = self.steps_executed,
                total_steps = self.total_steps,
                duration_ms = self.duration.as_millis() as u64,
                pacer = self.pacer,
                "{}", self
            );
        } else {
            tracing::info!(
                patient_id = self.patient_id,
                category = self.category,
                steps_executed = self.steps_executed,
                total_steps = self.total_steps,
                duration_ms = self.duration.as_millis() as u64,
                pacer = self.pacer,
                "{}", self
            );
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "crisis_protocol",
            span_name = name,
            patient_id = self.patient_id,
            category = self.category,
        )
    }
}

/// Lookup for a category with no registered protocol.
///
/// # Log Level
/// `warn!` - Degrades to an empty protocol
pub struct UnknownProtocolCategory<'a> {
    pub category: &'a str,
}

impl Display for UnknownProtocolCategory<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "No protocol registered for category '{}', continuing with an empty protocol",
            self.category
        )
    }
}

impl StructuredLog for UnknownProtocolCategory<'_> {
    fn log(&self) {
        tracing::warn!(category = self.category, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("protocol_lookup", span_name = name, category = self.category)
    }
}

/// Clinician response recorded.
///
/// # Log Level
/// `info!` - Clinically significant event
pub struct ClinicianResponseRecorded<'a> {
    pub patient_id: &'a str,
    pub action: &'a str,
}

impl Display for ClinicianResponseRecorded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Clinician response for patient {}: {}", self.patient_id, self.action)
    }
}

impl StructuredLog for ClinicianResponseRecorded<'_> {
    fn log(&self) {
        tracing::info!(patient_id = self.patient_id, action = self.action, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("clinician_response", span_name = name, patient_id = self.patient_id)
    }
}
