// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{
    DEFAULT_CRISIS_KEYWORDS, DEFAULT_HIGH_SEVERITY_THRESHOLD, DEFAULT_PROTOCOLS, DEFAULT_STEP_DELAY_MS,
};
use crate::errors::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for Careline.
///
/// Every section and field has a default, so an empty file (or no file at all) yields
/// the stock crisis rules and protocol table.
///
/// # Fields
/// * `bus` - Event bus dispatch options
/// * `crisis` - Crisis rules, pacing and the protocol table
///
/// # Example
/// ```yaml
/// bus:
///   handler_deadline_ms: 30000
/// crisis:
///   high_severity_threshold: 8
///   step_delay_ms: 500
///   keywords: ["suicidal", "hopeless"]
///   protocols:
///     suicide_risk:
///       - "Immediately alert on-call clinician"
///       - "Provide crisis hotline number"
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub bus: BusConfig,
    pub crisis: CrisisConfig,
}

/// Event bus options.
///
/// # Fields
/// * `handler_deadline_ms` - Abort handlers still running after this many milliseconds (optional)
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BusConfig {
    pub handler_deadline_ms: Option<u64>,
}

impl BusConfig {
    pub fn handler_deadline(&self) -> Option<Duration> {
        self.handler_deadline_ms.map(Duration::from_millis)
    }
}

/// Crisis escalation options.
///
/// # Fields
/// * `high_severity_threshold` - Severity at or above which an observation is a crisis (defaults to 8)
/// * `keywords` - Risk phrases matched case-insensitively against the observation message
/// * `step_delay_ms` - Pause before each protocol step (defaults to 500)
/// * `protocols` - Ordered remediation steps keyed by category
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CrisisConfig {
    pub high_severity_threshold: u8,
    pub keywords: Vec<String>,
    pub step_delay_ms: u64,
    pub protocols: BTreeMap<String, Vec<String>>,
}

impl Default for CrisisConfig {
    fn default() -> Self {
        Self {
            high_severity_threshold: DEFAULT_HIGH_SEVERITY_THRESHOLD,
            keywords: DEFAULT_CRISIS_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            step_delay_ms: DEFAULT_STEP_DELAY_MS,
            protocols: DEFAULT_PROTOCOLS
                .iter()
                .map(|(category, steps)| {
                    (category.to_string(), steps.iter().map(|s| s.to_string()).collect())
                })
                .collect(),
        }
    }
}

impl CrisisConfig {
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

/// Serialization format of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// Pick the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "toml" => Ok(ConfigFormat::Toml),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Parse configuration text in the given format
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<Config, ConfigError> {
    if content.trim().is_empty() {
        return Ok(Config::default());
    }

    let cfg: Config = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
        ConfigFormat::Toml => toml::from_str(content)?,
    };
    Ok(cfg)
}

/// Load a config from a YAML or TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)?;
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content, format)
}

/// Load and validate a config from a YAML or TOML file
///
/// All validation errors are reported together in [`ConfigError::Invalid`].
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let cfg = load_config(path)?;
    crate::config::validate_config(&cfg).map_err(ConfigError::Invalid)?;
    Ok(cfg)
}
