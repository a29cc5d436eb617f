// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Crisis escalation pipeline.
//!
//! An observation published on `symptom.observed` is classified by [`CrisisRules`]. A
//! confirmed crisis is announced on `crisis.alert` and its remediation protocol, looked up
//! in the [`ProtocolRegistry`], is paced step by step by the [`ProtocolExecutor`].
//! [`CrisisDetectionModule`] wires all of this onto an [`EventBus`](crate::bus::EventBus).

pub mod executor;
pub mod module;
pub mod protocol;
pub mod rules;

mod integration_tests;

pub use executor::{CrisisAlert, ExecutionReport, ExecutionState, ProtocolExecutor, StepExecuted};
pub use module::{ClinicianResponse, CrisisDetectionModule, ProtocolLookup};
pub use protocol::ProtocolRegistry;
pub use rules::{Classification, CrisisCategory, CrisisRules, Observation};
