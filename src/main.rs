// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::Context;
use serde_json::json;
use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};

use careline::bus::{topics, EventBus};
use careline::config::consts::DEFAULT_REQUEST_TIMEOUT_MS;
use careline::config::{load_and_validate_config, Config};
use careline::crisis::{CrisisAlert, CrisisDetectionModule, StepExecuted};
use careline::errors::HandlerError;
use careline::observability::init_tracing;
use careline::traits::FnHandler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let config = match args.get(1) {
        Some(path) => {
            load_and_validate_config(path).with_context(|| format!("Failed to load configuration from {}", path))?
        }
        None => Config::default(),
    };

    println!("🩺 Careline Crisis Escalation Demo");
    println!("═══════════════════════════════════");
    println!("Config file: {}", args.get(1).map(String::as_str).unwrap_or("(built-in defaults)"));
    println!("Step delay: {:?}", config.crisis.step_delay());
    println!();

    let start_time = Instant::now();
    let bus = EventBus::from_config(&config.bus);
    let module = CrisisDetectionModule::from_config(&bus, &config.crisis)?;
    register_collaborators(&bus)?;

    let observations = [
        json!({ "patient_id": "P001", "message": "I feel hopeless and cannot go on", "severity": 6 }),
        json!({ "patient_id": "P002", "message": "Panic attacks every night, no sleep", "severity": 9 }),
        json!({ "patient_id": "P003", "message": "Slight headache this morning", "severity": 2 }),
    ];
    for observation in observations {
        bus.publish(topics::SYMPTOM_OBSERVED, observation);
    }

    bus.publish(
        topics::CLINICIAN_RESPONDED,
        json!({ "patient_id": "P001", "action": "Called patient and reviewed safety plan" }),
    );

    let reply = bus
        .request(
            topics::PROTOCOL_LOOKUP,
            json!({ "category": "psychosis" }),
            Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        )
        .await?;
    println!("🔎 Protocol lookup ({}): {}", reply.payload["category"], reply.payload["steps"]);

    bus.drain().await;
    module.unregister();

    println!();
    println!("🎉 Demo complete in {:.2?}", start_time.elapsed());
    Ok(())
}

/// Demonstration collaborators: a documentation trail and a notifier that always fails.
fn register_collaborators(bus: &EventBus) -> anyhow::Result<()> {
    bus.subscribe(
        topics::CRISIS_ALERT,
        FnHandler::shared("documentation.alerts", |event, _ctx| async move {
            let alert: CrisisAlert = event.parse()?;
            println!(
                "🚨 [{}] {} alert for {} (severity {}): {} steps",
                event.sequence,
                alert.category,
                alert.patient_id,
                alert.severity,
                alert.protocol.len()
            );
            Ok::<(), HandlerError>(())
        }),
    )?;

    bus.subscribe(
        topics::CRISIS_STEP_EXECUTED,
        FnHandler::shared("documentation.steps", |event, _ctx| async move {
            let step: StepExecuted = event.parse()?;
            println!(
                "   ✅ {} step {}/{}: {}",
                step.patient_id,
                step.step_index + 1,
                step.total_steps,
                step.step
            );
            Ok::<(), HandlerError>(())
        }),
    )?;

    bus.subscribe(
        topics::CLINICIAN_RESPONSE_RECORDED,
        FnHandler::shared("documentation.responses", |event, _ctx| async move {
            println!("📝 Clinician response recorded: {}", event.payload);
            Ok::<(), HandlerError>(())
        }),
    )?;

    bus.subscribe(
        topics::SYMPTOM_OBSERVED,
        FnHandler::shared("notifications.pager", |_event, _ctx| async move {
            Err::<(), HandlerError>(anyhow::anyhow!("pager gateway unreachable").into())
        }),
    )?;

    bus.subscribe(
        topics::HANDLER_FAILED,
        FnHandler::shared("diagnostics.console", |event, _ctx| async move {
            println!("⚠️  Handler failure isolated: {}", event.payload["reason"]);
            Ok::<(), HandlerError>(())
        }),
    )?;

    Ok(())
}
