//! Policy Types
//!
//! Per-vertical thresholds, weights and rule toggles, plus the immutable
//! snapshot readers evaluate against.
//! KHÔNG chứa logic swap - chỉ data structures và validation.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::ConfigError;
use crate::logic::rules::RuleMeta;

// ============================================================================
// ENSEMBLE WEIGHTS
// ============================================================================

/// Rule/model blend. Shares must each be in [0, 1] and sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnsembleWeights {
    pub rule_weight: f64,
    pub model_weight: f64,
}

impl Default for EnsembleWeights {
    fn default() -> Self {
        Self {
            rule_weight: constants::DEFAULT_RULE_WEIGHT,
            model_weight: constants::DEFAULT_MODEL_WEIGHT,
        }
    }
}

impl EnsembleWeights {
    pub fn new(rule_weight: f64, model_weight: f64) -> Self {
        Self { rule_weight, model_weight }
    }

    fn validate(&self, vertical: &str) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidPolicy {
            vertical: vertical.to_string(),
            reason,
        };
        for (name, w) in [("rule_weight", self.rule_weight), ("model_weight", self.model_weight)] {
            if !w.is_finite() || !(0.0..=1.0).contains(&w) {
                return Err(invalid(format!("{} {} outside [0, 1]", name, w)));
            }
        }
        if (self.rule_weight + self.model_weight - 1.0).abs() > 1e-6 {
            return Err(invalid(format!(
                "ensemble weights sum to {}, expected 1",
                self.rule_weight + self.model_weight
            )));
        }
        Ok(())
    }
}

// ============================================================================
// VERTICAL POLICY
// ============================================================================

fn default_decline() -> u32 {
    constants::DEFAULT_DECLINE_THRESHOLD
}

fn default_review() -> u32 {
    constants::DEFAULT_REVIEW_THRESHOLD
}

fn default_true() -> bool {
    true
}

/// Configuration for one vertical
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerticalPolicy {
    pub vertical: String,
    #[serde(default = "default_decline")]
    pub decline_threshold: u32,
    #[serde(default = "default_review")]
    pub review_threshold: u32,
    /// rule id → multiplier; absent = 1.0
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
    #[serde(default)]
    pub disabled_rules: BTreeSet<String>,
    #[serde(default)]
    pub ensemble: EnsembleWeights,
    /// false = score rule-only for this vertical
    #[serde(default = "default_true")]
    pub model_enabled: bool,
}

impl VerticalPolicy {
    pub fn new(vertical: &str) -> Self {
        Self {
            vertical: vertical.to_string(),
            decline_threshold: constants::DEFAULT_DECLINE_THRESHOLD,
            review_threshold: constants::DEFAULT_REVIEW_THRESHOLD,
            weights: BTreeMap::new(),
            disabled_rules: BTreeSet::new(),
            ensemble: EnsembleWeights::default(),
            model_enabled: true,
        }
    }

    pub fn with_thresholds(mut self, decline: u32, review: u32) -> Self {
        self.decline_threshold = decline;
        self.review_threshold = review;
        self
    }

    pub fn with_weight(mut self, rule_id: &str, weight: f64) -> Self {
        self.weights.insert(rule_id.to_string(), weight);
        self
    }

    pub fn with_disabled(mut self, rule_id: &str) -> Self {
        self.disabled_rules.insert(rule_id.to_string());
        self
    }

    pub fn with_ensemble(mut self, rule_weight: f64, model_weight: f64) -> Self {
        self.ensemble = EnsembleWeights::new(rule_weight, model_weight);
        self
    }

    pub fn without_model(mut self) -> Self {
        self.model_enabled = false;
        self
    }

    /// Multiplier for a rule (1.0 unless configured)
    pub fn weight(&self, rule_id: &str) -> f64 {
        self.weights.get(rule_id).copied().unwrap_or(1.0)
    }

    /// Reject a policy before it can reach live traffic
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidPolicy {
            vertical: self.vertical.clone(),
            reason,
        };

        if self.vertical.trim().is_empty() {
            return Err(invalid("empty vertical name".to_string()));
        }
        if self.decline_threshold < self.review_threshold {
            return Err(ConfigError::InvertedThresholds {
                vertical: self.vertical.clone(),
                decline: self.decline_threshold,
                review: self.review_threshold,
            });
        }
        if self.decline_threshold > 100 {
            return Err(invalid(format!(
                "decline threshold {} above 100",
                self.decline_threshold
            )));
        }
        for (rule_id, w) in &self.weights {
            if !w.is_finite() || *w < 0.0 {
                return Err(invalid(format!("weight {} for rule '{}' must be finite and >= 0", w, rule_id)));
            }
        }
        self.ensemble.validate(&self.vertical)
    }
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// One consistent view of every vertical's policy plus global rule toggles.
/// Never mutated once published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySnapshot {
    pub version: u64,
    pub policies: BTreeMap<String, VerticalPolicy>,
    /// Used for any vertical without its own entry
    pub default_policy: VerticalPolicy,
    /// Rules switched off everywhere
    pub globally_disabled: BTreeSet<String>,
    /// Rules switched on everywhere, overriding a definition's `enabled: false`
    pub globally_enabled: BTreeSet<String>,
}

impl Default for PolicySnapshot {
    fn default() -> Self {
        Self {
            version: 0,
            policies: BTreeMap::new(),
            default_policy: VerticalPolicy::new(constants::DEFAULT_VERTICAL),
            globally_disabled: BTreeSet::new(),
            globally_enabled: BTreeSet::new(),
        }
    }
}

impl PolicySnapshot {
    pub fn with_policy(mut self, policy: VerticalPolicy) -> Self {
        if policy.vertical == constants::DEFAULT_VERTICAL {
            self.default_policy = policy;
        } else {
            self.policies.insert(policy.vertical.clone(), policy);
        }
        self
    }

    /// Policy for a vertical, falling back to the default policy
    pub fn policy(&self, vertical: &str) -> &VerticalPolicy {
        self.policies.get(vertical).unwrap_or(&self.default_policy)
    }

    pub fn is_configured(&self, vertical: &str) -> bool {
        vertical == constants::DEFAULT_VERTICAL || self.policies.contains_key(vertical)
    }

    /// Effective enablement: definition default, then global toggles,
    /// then the vertical's own disabled set.
    pub fn is_rule_active(&self, meta: &RuleMeta, vertical: &str) -> bool {
        let enabled = if self.globally_disabled.contains(&meta.id) {
            false
        } else {
            meta.enabled || self.globally_enabled.contains(&meta.id)
        };
        enabled && !self.policy(vertical).disabled_rules.contains(&meta.id)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.default_policy.validate()?;
        for (key, policy) in &self.policies {
            if key != &policy.vertical {
                return Err(ConfigError::InvalidPolicy {
                    vertical: key.clone(),
                    reason: format!("entry keyed '{}' names vertical '{}'", key, policy.vertical),
                });
            }
            policy.validate()?;
        }
        Ok(())
    }

    /// Every rule id this snapshot mentions
    pub fn referenced_rules(&self) -> BTreeSet<&str> {
        let mut ids: BTreeSet<&str> = BTreeSet::new();
        for policy in std::iter::once(&self.default_policy).chain(self.policies.values()) {
            ids.extend(policy.weights.keys().map(String::as_str));
            ids.extend(policy.disabled_rules.iter().map(String::as_str));
        }
        ids.extend(self.globally_disabled.iter().map(String::as_str));
        ids.extend(self.globally_enabled.iter().map(String::as_str));
        ids
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::rules::{RuleCategory, Severity};

    #[test]
    fn test_inverted_thresholds_rejected() {
        let policy = VerticalPolicy::new("lending").with_thresholds(40, 60);
        assert!(matches!(
            policy.validate(),
            Err(ConfigError::InvertedThresholds { decline: 40, review: 60, .. })
        ));
    }

    #[test]
    fn test_equal_thresholds_allowed() {
        assert!(VerticalPolicy::new("x").with_thresholds(60, 60).validate().is_ok());
    }

    #[test]
    fn test_ensemble_must_sum_to_one() {
        let policy = VerticalPolicy::new("crypto").with_ensemble(0.7, 0.7);
        assert!(matches!(policy.validate(), Err(ConfigError::InvalidPolicy { .. })));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let policy = VerticalPolicy::new("crypto").with_weight("TOR_EXIT_NODE", -1.0);
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_unknown_vertical_falls_back() {
        let snapshot = PolicySnapshot::default()
            .with_policy(VerticalPolicy::new("lending").with_thresholds(80, 60));

        assert_eq!(snapshot.policy("lending").decline_threshold, 80);
        assert_eq!(snapshot.policy("space-tourism").vertical, "default");
    }

    #[test]
    fn test_rule_activity_layers() {
        let meta = RuleMeta::new("R", "r", RuleCategory::Custom, Severity::Low, 1);
        let mut snapshot = PolicySnapshot::default()
            .with_policy(VerticalPolicy::new("gaming").with_disabled("R"));

        assert!(snapshot.is_rule_active(&meta, "crypto"));
        assert!(!snapshot.is_rule_active(&meta, "gaming"));

        snapshot.globally_disabled.insert("R".to_string());
        assert!(!snapshot.is_rule_active(&meta, "crypto"));

        let off = meta.clone().disabled();
        let mut snapshot = PolicySnapshot::default();
        assert!(!snapshot.is_rule_active(&off, "crypto"));
        snapshot.globally_enabled.insert("R".to_string());
        assert!(snapshot.is_rule_active(&off, "crypto"));
    }
}
