//! Rule Loader
//!
//! Declarative rules from a JSON file:
//!
//! ```json
//! { "rules": [ { "id": "GIFT_CARD_TOR", "name": "...", "category": "commerce",
//!                "severity": "high", "base_score": 25, "verticals": ["ecommerce"],
//!                "message": "Gift cards over Tor ({gift_card_count})",
//!                "conditions": [ {"is_true": {"field": "ip_tor"}},
//!                                {"num_at_least": {"field": "gift_card_count", "value": 2}} ] } ] }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use super::condition::{Condition, DeclarativeLogic};
use super::types::{Rule, RuleCategory, RuleMeta, Severity};

/// Upper bound for any single rule's base score
pub const MAX_BASE_SCORE: u32 = 100;

fn default_true() -> bool {
    true
}

fn default_confidence() -> f64 {
    0.8
}

fn default_category() -> RuleCategory {
    RuleCategory::Custom
}

/// Authored form of a config-loaded rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub id: String,
    pub name: String,
    #[serde(default = "default_category")]
    pub category: RuleCategory,
    pub severity: Severity,
    pub base_score: u32,
    #[serde(default)]
    pub verticals: Vec<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    pub message: String,
    #[serde(default)]
    pub description: String,
    pub conditions: Vec<Condition>,
}

impl RuleDefinition {
    /// Validate and compile into a catalog rule
    pub fn compile(&self) -> Result<Rule, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidRule {
            rule_id: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("empty rule id"));
        }
        if self.conditions.is_empty() {
            return Err(invalid("rule has no conditions"));
        }
        if self.base_score > MAX_BASE_SCORE {
            return Err(invalid("base_score above 100"));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(invalid("confidence outside [0, 1]"));
        }

        let conditions = self
            .conditions
            .iter()
            .map(|c| c.compile(&self.id))
            .collect::<Result<Vec<_>, _>>()?;

        let mut meta = RuleMeta::new(&self.id, &self.name, self.category, self.severity, self.base_score)
            .describe(&self.description);
        meta.verticals = self.verticals.clone();
        meta.enabled = self.enabled;

        Ok(Rule::declarative(
            meta,
            DeclarativeLogic::new(conditions, self.confidence, &self.message),
        ))
    }
}

/// On-disk rules file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleFile {
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

impl RuleFile {
    pub fn parse(text: &str, origin: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text, &path.display().to_string())
    }
}
