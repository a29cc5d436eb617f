// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod integration_tests {
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;

    use crate::bus::stub::{FailingHandler, RecordingHandler};
    use crate::bus::{topics, EventBus};
    use crate::config::load_and_validate_config;
    use crate::crisis::{
        CrisisAlert, CrisisCategory, CrisisDetectionModule, CrisisRules, ProtocolRegistry, StepExecuted,
    };
    use crate::errors::RequestError;
    use crate::traits::{FixedDelay, NoDelay, Pacer};

    const WAIT: Duration = Duration::from_secs(2);

    struct Harness {
        bus: EventBus,
        alerts: Arc<RecordingHandler>,
        steps: Arc<RecordingHandler>,
        failures: Arc<RecordingHandler>,
        module: CrisisDetectionModule,
    }

    fn harness_with(registry: ProtocolRegistry, pacer: Arc<dyn Pacer>) -> Harness {
        let bus = EventBus::new();
        let module = CrisisDetectionModule::register(&bus, CrisisRules::default(), Arc::new(registry), pacer).unwrap();

        let alerts = Arc::new(RecordingHandler::new("alerts"));
        let steps = Arc::new(RecordingHandler::new("steps"));
        let failures = Arc::new(RecordingHandler::new("failures"));
        bus.subscribe(topics::CRISIS_ALERT, alerts.clone()).unwrap();
        bus.subscribe(topics::CRISIS_STEP_EXECUTED, steps.clone()).unwrap();
        bus.subscribe(topics::HANDLER_FAILED, failures.clone()).unwrap();

        Harness {
            bus,
            alerts,
            steps,
            failures,
            module,
        }
    }

    fn harness() -> Harness {
        harness_with(ProtocolRegistry::default(), Arc::new(NoDelay))
    }

    fn observation(patient_id: &str, message: &str, severity: u8) -> Value {
        json!({ "patient_id": patient_id, "message": message, "severity": severity })
    }

    fn step_trail(recorder: &RecordingHandler, patient_id: &str) -> Vec<(usize, String)> {
        recorder
            .events_by_sequence()
            .iter()
            .map(|e| e.parse::<StepExecuted>().unwrap())
            .filter(|s| s.patient_id == patient_id)
            .map(|s| (s.step_index, s.step))
            .collect()
    }

    /// Keyword observation runs the full suicide-risk protocol in order, after the alert
    #[tokio::test]
    async fn test_keyword_observation_runs_suicide_protocol() {
        let h = harness();

        h.bus
            .publish(topics::SYMPTOM_OBSERVED, observation("P001", "I want to kill myself", 3));
        assert!(h.steps.wait_for(4, WAIT).await);
        h.bus.drain().await;

        let alerts = h.alerts.events();
        assert_eq!(alerts.len(), 1);
        let alert: CrisisAlert = alerts[0].parse().unwrap();
        assert_eq!(alert.category, CrisisCategory::SuicideRisk);
        assert_eq!(alert.severity, 3);
        assert_eq!(alert.protocol.len(), 4);

        let first_step = h.steps.events_by_sequence()[0].sequence;
        assert!(alerts[0].sequence < first_step);

        let trail = step_trail(&h.steps, "P001");
        let expected: Vec<(usize, String)> = alert.protocol.iter().cloned().enumerate().collect();
        assert_eq!(trail, expected);
    }

    /// Severity-only crisis has no default protocol and degrades to an empty one
    #[tokio::test]
    async fn test_severity_only_observation_uses_empty_protocol() {
        let h = harness();

        h.bus
            .publish(topics::SYMPTOM_OBSERVED, observation("P002", "feeling okay today", 9));
        assert!(h.alerts.wait_for(1, WAIT).await);
        h.bus.drain().await;

        let alert: CrisisAlert = h.alerts.events()[0].parse().unwrap();
        assert_eq!(alert.category, CrisisCategory::SevereSymptoms);
        assert!(alert.protocol.is_empty());
        assert_eq!(h.steps.count(), 0);
        assert_eq!(h.failures.count(), 0);
    }

    #[tokio::test]
    async fn test_non_crisis_observation_publishes_nothing() {
        let h = harness();

        h.bus
            .publish(topics::SYMPTOM_OBSERVED, observation("P003", "slight headache", 2));
        h.bus.drain().await;

        assert_eq!(h.alerts.count(), 0);
        assert_eq!(h.steps.count(), 0);
        assert_eq!(h.failures.count(), 0);
    }

    /// A failing sibling on symptom.observed does not stop the crisis pipeline
    #[tokio::test]
    async fn test_failing_sibling_does_not_block_escalation() {
        let h = harness();
        let failing = Arc::new(FailingHandler::new("broken_notifier"));
        h.bus.subscribe(topics::SYMPTOM_OBSERVED, failing.clone()).unwrap();

        h.bus
            .publish(topics::SYMPTOM_OBSERVED, observation("P004", "I feel hopeless", 5));
        assert!(h.steps.wait_for(4, WAIT).await);
        assert!(h.failures.wait_for(1, WAIT).await);
        h.bus.drain().await;

        assert_eq!(failing.attempts(), 1);
        assert_eq!(h.alerts.count(), 1);

        let diagnostic = &h.failures.events()[0].payload;
        assert_eq!(diagnostic["handler"], "broken_notifier");
        assert_eq!(diagnostic["event_type"], topics::SYMPTOM_OBSERVED);
        assert_eq!(diagnostic["kind"], "returned");
    }

    /// Malformed observations surface as handler failures, not silence
    #[tokio::test]
    async fn test_malformed_observation_is_reported() {
        let h = harness();

        h.bus
            .publish(topics::SYMPTOM_OBSERVED, json!({ "patient_id": "P005", "severity": 9 }));
        assert!(h.failures.wait_for(1, WAIT).await);
        h.bus.drain().await;

        assert_eq!(h.alerts.count(), 0);
        let diagnostic = &h.failures.events()[0].payload;
        assert_eq!(diagnostic["handler"], "crisis.symptom_evaluator");
        assert!(diagnostic["reason"].as_str().unwrap().contains("malformed"));
    }

    /// Runs for different patients are independent and each keeps its own step order
    #[tokio::test]
    async fn test_concurrent_patients_keep_independent_order() {
        let h = harness_with(ProtocolRegistry::default(), Arc::new(FixedDelay(Duration::from_millis(5))));
        let patients = ["P010", "P011", "P012"];

        for patient in patients {
            h.bus
                .publish(topics::SYMPTOM_OBSERVED, observation(patient, "suicidal thoughts", 4));
        }
        assert!(h.steps.wait_for(12, WAIT).await);
        h.bus.drain().await;

        assert_eq!(h.alerts.count(), 3);
        for patient in patients {
            let indices: Vec<usize> = step_trail(&h.steps, patient).into_iter().map(|(i, _)| i).collect();
            assert_eq!(indices, vec![0, 1, 2, 3], "patient {}", patient);
        }
    }

    /// Repeated observations for the same patient launch overlapping runs
    #[tokio::test]
    async fn test_same_patient_runs_are_not_coalesced() {
        let h = harness();

        h.bus
            .publish(topics::SYMPTOM_OBSERVED, observation("P020", "hopeless", 5));
        h.bus
            .publish(topics::SYMPTOM_OBSERVED, observation("P020", "hopeless", 5));
        assert!(h.steps.wait_for(8, WAIT).await);
        h.bus.drain().await;

        assert_eq!(h.alerts.count(), 2);
        assert_eq!(step_trail(&h.steps, "P020").len(), 8);
    }

    /// Shutting the bus down cancels a protocol run that is still pacing
    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_paced_protocol() {
        let h = harness_with(ProtocolRegistry::default(), Arc::new(FixedDelay(Duration::from_millis(500))));

        h.bus
            .publish(topics::SYMPTOM_OBSERVED, observation("P030", "cannot go on", 6));
        assert!(h.steps.wait_for(1, WAIT).await);
        h.bus.shutdown();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(h.steps.count(), 1);
        assert!(h.bus.is_shut_down());
        assert_eq!(h.bus.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_clinician_response_is_echoed() {
        let h = harness();
        let recorded = Arc::new(RecordingHandler::new("recorded"));
        h.bus
            .subscribe(topics::CLINICIAN_RESPONSE_RECORDED, recorded.clone())
            .unwrap();

        let response = json!({ "patient_id": "P001", "action": "Called patient, safety plan reviewed" });
        h.bus.publish(topics::CLINICIAN_RESPONDED, response.clone());
        assert!(recorded.wait_for(1, WAIT).await);

        assert_eq!(recorded.events()[0].payload, response);
    }

    #[tokio::test]
    async fn test_clinician_response_without_action_is_reported() {
        let h = harness();

        h.bus
            .publish(topics::CLINICIAN_RESPONDED, json!({ "patient_id": "P001", "action": " " }));
        assert!(h.failures.wait_for(1, WAIT).await);

        assert_eq!(h.failures.events()[0].payload["handler"], "crisis.clinician_response_recorder");
    }

    #[tokio::test]
    async fn test_protocol_lookup_request() {
        let h = harness();

        let reply = h
            .bus
            .request(topics::PROTOCOL_LOOKUP, json!({ "category": "psychosis" }), WAIT)
            .await
            .unwrap();
        assert_eq!(reply.event_type, topics::reply_to(topics::PROTOCOL_LOOKUP));
        assert_eq!(reply.payload["category"], "psychosis");
        assert_eq!(reply.payload["steps"].as_array().unwrap().len(), 4);

        let unknown = h
            .bus
            .request(topics::PROTOCOL_LOOKUP, json!({ "category": "severe_symptoms" }), WAIT)
            .await
            .unwrap();
        assert_eq!(unknown.payload["steps"], json!([]));
    }

    #[tokio::test]
    async fn test_lookup_after_unregister_has_no_responder() {
        let h = harness();
        h.module.unregister();

        let result = h
            .bus
            .request(topics::PROTOCOL_LOOKUP, json!({ "category": "psychosis" }), WAIT)
            .await;
        assert!(matches!(result, Err(RequestError::NoResponder(_))));
    }

    /// The shipped YAML configuration drives the pipeline end to end
    #[tokio::test]
    async fn test_yaml_config_pipeline() {
        let mut config = load_and_validate_config("configs/careline.yaml").unwrap();
        assert_eq!(config.bus.handler_deadline_ms, Some(30_000));
        assert_eq!(config.crisis.protocols["severe_symptoms"].len(), 2);
        config.crisis.step_delay_ms = 0;

        let bus = EventBus::from_config(&config.bus);
        let _module = CrisisDetectionModule::from_config(&bus, &config.crisis).unwrap();
        let steps = Arc::new(RecordingHandler::new("steps"));
        bus.subscribe(topics::CRISIS_STEP_EXECUTED, steps.clone()).unwrap();

        bus.publish(topics::SYMPTOM_OBSERVED, observation("P040", "pain everywhere", 10));
        assert!(steps.wait_for(2, WAIT).await);
        bus.drain().await;

        assert_eq!(
            step_trail(&steps, "P040"),
            vec![
                (0, "Alert treating clinician".to_string()),
                (1, "Schedule same-day check-in".to_string()),
            ]
        );
    }

    #[test]
    fn test_toml_config_loading() {
        let config = load_and_validate_config("configs/careline.toml").unwrap();

        assert_eq!(config.crisis.high_severity_threshold, 9);
        assert_eq!(config.crisis.step_delay_ms, 0);
        assert_eq!(config.crisis.protocols.len(), 1);
        assert_eq!(CrisisRules::from_config(&config.crisis).keywords().len(), 8);
    }
}
