//! Rule Types
//!
//! Rule metadata, evaluation logic variants, and the flags rules emit.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::RuleError;
use crate::logic::context::TransactionContext;

use super::condition::DeclarativeLogic;

// ============================================================================
// SEVERITY
// ============================================================================

/// Ordered: Low < Medium < High < Critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// CATEGORY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Velocity,
    Amount,
    Account,
    Device,
    Network,
    Identity,
    Consortium,
    Behavioral,
    Lending,
    Crypto,
    Commerce,
    Gaming,
    Custom,
}

impl RuleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::Velocity => "velocity",
            RuleCategory::Amount => "amount",
            RuleCategory::Account => "account",
            RuleCategory::Device => "device",
            RuleCategory::Network => "network",
            RuleCategory::Identity => "identity",
            RuleCategory::Consortium => "consortium",
            RuleCategory::Behavioral => "behavioral",
            RuleCategory::Lending => "lending",
            RuleCategory::Crypto => "crypto",
            RuleCategory::Commerce => "commerce",
            RuleCategory::Gaming => "gaming",
            RuleCategory::Custom => "custom",
        }
    }
}

impl std::fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// RULE METADATA
// ============================================================================

/// Everything about a rule except how it evaluates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleMeta {
    pub id: String,
    pub name: String,
    pub category: RuleCategory,
    pub severity: Severity,
    pub base_score: u32,
    /// Empty = applies to every vertical
    pub verticals: Vec<String>,
    pub enabled: bool,
    pub description: String,
}

impl RuleMeta {
    pub fn new(id: &str, name: &str, category: RuleCategory, severity: Severity, base_score: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            category,
            severity,
            base_score,
            verticals: Vec::new(),
            enabled: true,
            description: String::new(),
        }
    }

    pub fn for_verticals(mut self, verticals: &[&str]) -> Self {
        self.verticals = verticals.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn applies_to(&self, vertical: &str) -> bool {
        self.verticals.is_empty() || self.verticals.iter().any(|v| v == vertical)
    }
}

// ============================================================================
// RULE LOGIC
// ============================================================================

/// Native rule body. Must be pure: no I/O, no interior mutation.
pub type RuleFn = fn(&TransactionContext) -> Result<Option<RuleHit>, RuleError>;

/// The closed set of ways a rule can evaluate
#[derive(Debug, Clone)]
pub enum RuleLogic {
    Native(RuleFn),
    Declarative(DeclarativeLogic),
}

/// A registered rule
#[derive(Debug, Clone)]
pub struct Rule {
    pub meta: RuleMeta,
    logic: RuleLogic,
}

impl Rule {
    pub fn native(meta: RuleMeta, eval: RuleFn) -> Self {
        Self {
            meta,
            logic: RuleLogic::Native(eval),
        }
    }

    pub fn declarative(meta: RuleMeta, logic: DeclarativeLogic) -> Self {
        Self {
            meta,
            logic: RuleLogic::Declarative(logic),
        }
    }

    pub fn id(&self) -> &str {
        &self.meta.id
    }

    pub fn is_declarative(&self) -> bool {
        matches!(self.logic, RuleLogic::Declarative(_))
    }

    /// Run the rule body
    pub fn evaluate(&self, ctx: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
        match &self.logic {
            RuleLogic::Native(eval) => eval(ctx),
            RuleLogic::Declarative(logic) => logic.evaluate(ctx),
        }
    }

    /// Evaluate and turn a hit into a flag
    pub fn check(&self, ctx: &TransactionContext) -> Result<Option<Flag>, RuleError> {
        Ok(self.evaluate(ctx)?.map(|hit| Flag::from_hit(&self.meta, hit)))
    }
}

// ============================================================================
// HITS & FLAGS
// ============================================================================

/// What a rule body returns when it triggers
#[derive(Debug, Clone, PartialEq)]
pub struct RuleHit {
    pub confidence: f64,
    pub message: String,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl RuleHit {
    pub fn new(confidence: f64, message: impl Into<String>) -> Self {
        Self {
            confidence,
            message: message.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Output of one triggered rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flag {
    pub rule_id: String,
    pub rule_name: String,
    pub category: RuleCategory,
    pub severity: Severity,
    /// Unweighted base score
    pub score: u32,
    /// 0..1
    pub confidence: f64,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Flag {
    pub fn from_hit(meta: &RuleMeta, hit: RuleHit) -> Self {
        let confidence = if hit.confidence.is_finite() {
            hit.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };

        Self {
            rule_id: meta.id.clone(),
            rule_name: meta.name.clone(),
            category: meta.category,
            severity: meta.severity,
            score: meta.base_score,
            confidence,
            message: hit.message,
            metadata: hit.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_applies_to_vertical() {
        let universal = RuleMeta::new("A", "a", RuleCategory::Amount, Severity::Low, 5);
        assert!(universal.applies_to("anything"));

        let lending = universal.clone().for_verticals(&["lending"]);
        assert!(lending.applies_to("lending"));
        assert!(!lending.applies_to("crypto"));
    }

    #[test]
    fn test_flag_clamps_confidence() {
        let meta = RuleMeta::new("A", "a", RuleCategory::Amount, Severity::Low, 5);
        let flag = Flag::from_hit(&meta, RuleHit::new(3.0, "x"));
        assert_eq!(flag.confidence, 1.0);
        assert_eq!(flag.score, 5);
    }
}
