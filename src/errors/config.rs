// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unsupported config format '{0}' (expected .yaml, .yml or .toml)")]
    UnsupportedFormat(String),

    #[error("Configuration validation failed:\n{}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Errors found while validating a loaded configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The severity threshold lies outside the 1..=10 severity scale
    ThresholdOutOfRange {
        /// The configured threshold
        threshold: u8,
    },
    /// No crisis keywords were configured
    NoKeywords,
    /// A keyword is empty or whitespace only
    BlankKeyword {
        /// Position of the keyword in the configured list
        index: usize,
    },
    /// A protocol table entry has a blank category key
    BlankProtocolKey,
    /// A protocol step is empty or whitespace only
    BlankProtocolStep {
        /// The protocol containing the blank step
        category: String,
        /// Position of the step in the protocol
        index: usize,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::ThresholdOutOfRange { threshold } => {
                write!(
                    f,
                    "High severity threshold {} is outside the severity scale 1..=10",
                    threshold
                )
            }
            ValidationError::NoKeywords => {
                write!(f, "At least one crisis keyword must be configured")
            }
            ValidationError::BlankKeyword { index } => {
                write!(f, "Crisis keyword #{} is blank", index)
            }
            ValidationError::BlankProtocolKey => {
                write!(f, "Protocol table contains a blank category key")
            }
            ValidationError::BlankProtocolStep { category, index } => {
                write!(f, "Protocol '{}' step #{} is blank", category, index)
            }
        }
    }
}

impl std::error::Error for ValidationError {}
