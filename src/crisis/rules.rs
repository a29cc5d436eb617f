// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::bus::Event;
use crate::config::consts::{DEFAULT_CRISIS_KEYWORDS, DEFAULT_HIGH_SEVERITY_THRESHOLD, MAX_SEVERITY, MIN_SEVERITY};
use crate::config::CrisisConfig;
use crate::errors::HandlerError;

/// Classification bucket of a confirmed crisis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrisisCategory {
    SuicideRisk,
    SevereSymptoms,
}

impl CrisisCategory {
    /// Protocol registry key for this category.
    pub fn key(&self) -> &'static str {
        match self {
            CrisisCategory::SuicideRisk => "suicide_risk",
            CrisisCategory::SevereSymptoms => "severe_symptoms",
        }
    }
}

impl fmt::Display for CrisisCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Result of evaluating one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub is_crisis: bool,
    pub category: Option<CrisisCategory>,
}

impl Classification {
    pub fn none() -> Self {
        Self {
            is_crisis: false,
            category: None,
        }
    }

    pub fn crisis(category: CrisisCategory) -> Self {
        Self {
            is_crisis: true,
            category: Some(category),
        }
    }
}

/// Payload of a `symptom.observed` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub patient_id: String,
    pub message: String,
    /// 1 (mild) to 10 (most severe)
    pub severity: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Observation {
    /// Extract and validate an observation from an event payload.
    pub fn from_event(event: &Event) -> Result<Self, HandlerError> {
        let observation: Observation = event.parse()?;

        if observation.patient_id.trim().is_empty() {
            return Err(HandlerError::malformed(&event.event_type, "patient_id is empty"));
        }
        if !(MIN_SEVERITY..=MAX_SEVERITY).contains(&observation.severity) {
            return Err(HandlerError::malformed(
                &event.event_type,
                format!(
                    "severity {} outside {}..={}",
                    observation.severity, MIN_SEVERITY, MAX_SEVERITY
                ),
            ));
        }

        Ok(observation)
    }
}

/// Crisis detection rules: risk keywords plus a severity threshold.
///
/// Built once from configuration and shared read-only between handler runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrisisRules {
    keywords: Vec<String>,
    high_severity_threshold: u8,
}

impl CrisisRules {
    pub fn new<I, S>(keywords: I, high_severity_threshold: u8) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            high_severity_threshold,
        }
    }

    pub fn from_config(config: &CrisisConfig) -> Self {
        Self::new(&config.keywords, config.high_severity_threshold)
    }

    pub fn high_severity_threshold(&self) -> u8 {
        self.high_severity_threshold
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn matches_keyword(&self, message: &str) -> bool {
        let normalized = message.to_lowercase();
        self.keywords.iter().any(|k| normalized.contains(k.as_str()))
    }

    /// Classify an observation. A keyword match selects `SuicideRisk` even when the
    /// severity is below threshold.
    pub fn evaluate(&self, observation: &Observation) -> Classification {
        if self.matches_keyword(&observation.message) {
            Classification::crisis(CrisisCategory::SuicideRisk)
        } else if observation.severity >= self.high_severity_threshold {
            Classification::crisis(CrisisCategory::SevereSymptoms)
        } else {
            Classification::none()
        }
    }
}

impl Default for CrisisRules {
    fn default() -> Self {
        Self::new(DEFAULT_CRISIS_KEYWORDS, DEFAULT_HIGH_SEVERITY_THRESHOLD)
    }
}
