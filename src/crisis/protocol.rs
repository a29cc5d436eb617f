// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use crate::config::consts::DEFAULT_PROTOCOLS;
use crate::config::CrisisConfig;
use crate::crisis::rules::CrisisCategory;
use crate::observability::messages::crisis::UnknownProtocolCategory;
use crate::observability::messages::StructuredLog;

/// Immutable mapping from category key to ordered remediation steps.
///
/// Built once at startup and shared behind an `Arc`. Lookups for categories with no
/// entry return an empty protocol instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolRegistry {
    protocols: HashMap<String, Vec<String>>,
}

impl ProtocolRegistry {
    pub fn new<I, K, S>(protocols: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<S>)>,
        K: Into<String>,
        S: Into<String>,
    {
        Self {
            protocols: protocols
                .into_iter()
                .map(|(key, steps)| (key.into(), steps.into_iter().map(Into::into).collect()))
                .collect(),
        }
    }

    pub fn from_config(config: &CrisisConfig) -> Self {
        Self::new(config.protocols.clone())
    }

    /// Steps registered for `category`, or an empty slice with a warning when there are none.
    pub fn lookup(&self, category: &str) -> &[String] {
        match self.protocols.get(category) {
            Some(steps) => steps,
            None => {
                UnknownProtocolCategory { category }.log();
                &[]
            }
        }
    }

    pub fn steps_for(&self, category: CrisisCategory) -> &[String] {
        self.lookup(category.key())
    }

    pub fn contains(&self, category: &str) -> bool {
        self.protocols.contains_key(category)
    }

    /// Registered category keys, sorted.
    pub fn categories(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.protocols.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.protocols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }
}

impl Default for ProtocolRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_PROTOCOLS.iter().map(|(key, steps)| (*key, steps.to_vec())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_holds_stock_protocols() {
        let registry = ProtocolRegistry::default();

        assert_eq!(
            registry.categories(),
            vec!["psychosis", "self_harm_risk", "severe_depression", "suicide_risk"]
        );
        let steps = registry.steps_for(CrisisCategory::SuicideRisk);
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[0], "Immediately alert on-call clinician");
        assert_eq!(steps[3], "Schedule urgent follow-up within 24 hours");
    }

    #[test]
    fn test_unknown_category_yields_empty_protocol() {
        let registry = ProtocolRegistry::default();

        assert!(!registry.contains("severe_symptoms"));
        assert!(registry.steps_for(CrisisCategory::SevereSymptoms).is_empty());
        assert!(registry.lookup("not_a_category").is_empty());
    }

    #[test]
    fn test_registry_from_config() {
        let mut config = CrisisConfig::default();
        config.protocols.clear();
        config
            .protocols
            .insert("severe_symptoms".to_string(), vec!["A".to_string(), "B".to_string()]);

        let registry = ProtocolRegistry::from_config(&config);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.steps_for(CrisisCategory::SevereSymptoms), ["A", "B"]);
    }

    #[test]
    fn test_empty_registry() {
        let registry = ProtocolRegistry::new(Vec::<(String, Vec<String>)>::new());
        assert!(registry.is_empty());
        assert!(registry.lookup("suicide_risk").is_empty());
    }
}
