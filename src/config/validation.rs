// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Configuration validation.
//!
//! Checks are independent, so every problem is reported at once instead of one per run:
//!
//! 1. **Threshold**: the high severity threshold lies on the 1..=10 severity scale
//! 2. **Keywords**: at least one keyword, none blank
//! 3. **Protocols**: no blank category keys, no blank steps
//!
//! An empty protocol (a key with no steps) is valid; it degrades to an alert with no
//! remediation steps.

use crate::config::consts::{MAX_SEVERITY, MIN_SEVERITY};
use crate::config::Config;
use crate::errors::ValidationError;

/// Validate a loaded configuration, accumulating every error found.
pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let crisis = &config.crisis;

    if !(MIN_SEVERITY..=MAX_SEVERITY).contains(&crisis.high_severity_threshold) {
        errors.push(ValidationError::ThresholdOutOfRange {
            threshold: crisis.high_severity_threshold,
        });
    }

    if crisis.keywords.is_empty() {
        errors.push(ValidationError::NoKeywords);
    }
    for (index, keyword) in crisis.keywords.iter().enumerate() {
        if keyword.trim().is_empty() {
            errors.push(ValidationError::BlankKeyword { index });
        }
    }

    for (category, steps) in &crisis.protocols {
        if category.trim().is_empty() {
            errors.push(ValidationError::BlankProtocolKey);
        }
        for (index, step) in steps.iter().enumerate() {
            if step.trim().is_empty() {
                errors.push(ValidationError::BlankProtocolStep {
                    category: category.clone(),
                    index,
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
