// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::Instrument;

use crate::bus::{topics, Event, EventBus};
use crate::config::CrisisConfig;
use crate::crisis::executor::ProtocolExecutor;
use crate::crisis::protocol::ProtocolRegistry;
use crate::crisis::rules::{CrisisRules, Observation};
use crate::errors::{HandlerError, RegistrationError};
use crate::observability::messages::crisis::{ClinicianResponseRecorded, ObservationClassified};
use crate::observability::messages::StructuredLog;
use crate::traits::{DispatchContext, EventHandler, FixedDelay, HandlerRef, NoDelay, Pacer};

/// Payload of a `crisis.clinician.responded` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicianResponse {
    pub patient_id: String,
    pub action: String,
}

/// Payload of a `crisis.protocol.lookup` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolLookup {
    pub category: String,
}

/// Crisis detection wired onto an event bus.
///
/// Owns the three handlers of the crisis pipeline:
///
/// | Tag | Handler |
/// |---|---|
/// | `symptom.observed` | classify, then publish the alert and run the protocol |
/// | `crisis.clinician.responded` | validate and echo to `crisis.clinician.response.recorded` |
/// | `crisis.protocol.lookup` | reply with the steps registered for a category |
pub struct CrisisDetectionModule {
    bus: EventBus,
    registry: Arc<ProtocolRegistry>,
    subscriptions: Vec<(&'static str, HandlerRef)>,
}

impl CrisisDetectionModule {
    pub fn register(
        bus: &EventBus,
        rules: CrisisRules,
        registry: Arc<ProtocolRegistry>,
        pacer: Arc<dyn Pacer>,
    ) -> Result<Self, RegistrationError> {
        let executor = ProtocolExecutor::new(bus.clone(), registry.clone(), pacer);

        let subscriptions: Vec<(&'static str, HandlerRef)> = vec![
            (
                topics::SYMPTOM_OBSERVED,
                Arc::new(SymptomEvaluator {
                    rules: Arc::new(rules),
                    executor,
                }) as HandlerRef,
            ),
            (
                topics::CLINICIAN_RESPONDED,
                Arc::new(ClinicianResponseRecorder { bus: bus.clone() }) as HandlerRef,
            ),
            (
                topics::PROTOCOL_LOOKUP,
                Arc::new(ProtocolLookupResponder {
                    bus: bus.clone(),
                    registry: registry.clone(),
                }) as HandlerRef,
            ),
        ];

        for (event_type, handler) in &subscriptions {
            bus.subscribe(event_type, handler.clone())?;
        }

        Ok(Self {
            bus: bus.clone(),
            registry,
            subscriptions,
        })
    }

    /// Register with rules, protocols and pacing taken from configuration.
    pub fn from_config(bus: &EventBus, config: &CrisisConfig) -> Result<Self, RegistrationError> {
        let pacer: Arc<dyn Pacer> = if config.step_delay_ms == 0 {
            Arc::new(NoDelay)
        } else {
            Arc::new(FixedDelay(config.step_delay()))
        };

        Self::register(
            bus,
            CrisisRules::from_config(config),
            Arc::new(ProtocolRegistry::from_config(config)),
            pacer,
        )
    }

    pub fn registry(&self) -> &ProtocolRegistry {
        &self.registry
    }

    /// Event type tags this module listens on.
    pub fn event_types(&self) -> Vec<&'static str> {
        self.subscriptions.iter().map(|(event_type, _)| *event_type).collect()
    }

    /// Remove every handler this module registered. Runs already in flight continue.
    pub fn unregister(self) {
        for (event_type, handler) in &self.subscriptions {
            self.bus.unsubscribe(event_type, handler);
        }
    }
}

struct SymptomEvaluator {
    rules: Arc<CrisisRules>,
    executor: ProtocolExecutor,
}

#[async_trait]
impl EventHandler for SymptomEvaluator {
    async fn handle(&self, event: Arc<Event>, ctx: DispatchContext) -> Result<(), HandlerError> {
        let observation = Observation::from_event(&event)?;
        let classification = self.rules.evaluate(&observation);

        let classified = ObservationClassified {
            patient_id: &observation.patient_id,
            severity: observation.severity,
            is_crisis: classification.is_crisis,
            category: classification.category.map(|c| c.key()),
        };
        classified.log();

        let Some(category) = classification.category else {
            return Ok(());
        };

        let span = classified.span("symptom_evaluation");
        self.executor
            .run(&observation, category, ctx.cancellation())
            .instrument(span)
            .await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "crisis.symptom_evaluator"
    }
}

struct ClinicianResponseRecorder {
    bus: EventBus,
}

#[async_trait]
impl EventHandler for ClinicianResponseRecorder {
    async fn handle(&self, event: Arc<Event>, _ctx: DispatchContext) -> Result<(), HandlerError> {
        let response: ClinicianResponse = event.parse()?;
        if response.patient_id.trim().is_empty() {
            return Err(HandlerError::malformed(&event.event_type, "patient_id is empty"));
        }
        if response.action.trim().is_empty() {
            return Err(HandlerError::malformed(&event.event_type, "action is empty"));
        }

        ClinicianResponseRecorded {
            patient_id: &response.patient_id,
            action: &response.action,
        }
        .log();

        self.bus
            .publish(topics::CLINICIAN_RESPONSE_RECORDED, event.payload.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "crisis.clinician_response_recorder"
    }
}

struct ProtocolLookupResponder {
    bus: EventBus,
    registry: Arc<ProtocolRegistry>,
}

#[async_trait]
impl EventHandler for ProtocolLookupResponder {
    async fn handle(&self, event: Arc<Event>, _ctx: DispatchContext) -> Result<(), HandlerError> {
        let lookup: ProtocolLookup = event.parse()?;
        let steps = self.registry.lookup(&lookup.category);

        self.bus
            .respond(&event, json!({ "category": lookup.category, "steps": steps }))
            .map_err(|e| HandlerError::Failed(anyhow::Error::new(e)))
    }

    fn name(&self) -> &str {
        "crisis.protocol_lookup"
    }
}
