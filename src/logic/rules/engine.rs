//! Rule Engine
//!
//! CHỈ chứa logic evaluate - không có rule definitions.
//! Input: RuleCatalog + TransactionContext + vertical + PolicySnapshot
//! Output: RuleEvaluation (ordered flags + isolated failures)

use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::{Deserialize, Serialize};

use crate::error::RuleError;
use crate::logic::context::TransactionContext;
use crate::logic::policy::PolicySnapshot;

use super::catalog::RuleCatalog;
use super::types::{Flag, Rule};

// ============================================================================
// RESULT TYPES
// ============================================================================

/// A rule that errored and was treated as non-triggering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleFailure {
    pub rule_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleEvaluation {
    /// Severity desc, score desc, rule id asc
    pub flags: Vec<Flag>,
    pub failures: Vec<RuleFailure>,
    /// Number of rules actually run
    pub evaluated: usize,
}

// ============================================================================
// EVALUATION
// ============================================================================

/// Evaluate every rule that applies to `vertical` and is active in `policy`.
///
/// Fail-open: a rule that errors or panics contributes nothing and does not
/// affect any other rule.
pub fn evaluate(
    catalog: &RuleCatalog,
    ctx: &TransactionContext,
    vertical: &str,
    policy: &PolicySnapshot,
) -> RuleEvaluation {
    let mut result = RuleEvaluation::default();

    for rule in catalog.for_vertical(vertical) {
        if !policy.is_rule_active(&rule.meta, vertical) {
            continue;
        }
        result.evaluated += 1;

        match run_isolated(rule, ctx) {
            Ok(Some(flag)) => result.flags.push(flag),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(rule_id = %rule.meta.id, vertical, error = %e, "Rule evaluation failed");
                result.failures.push(RuleFailure {
                    rule_id: rule.meta.id.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    sort_flags(&mut result.flags);
    result
}

fn run_isolated(rule: &Rule, ctx: &TransactionContext) -> Result<Option<Flag>, RuleError> {
    match catch_unwind(AssertUnwindSafe(|| rule.check(ctx))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(RuleError::Panicked(message))
        }
    }
}

/// Stable explanation order
pub fn sort_flags(flags: &mut [Flag]) {
    flags.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.score.cmp(&a.score))
            .then_with(|| a.rule_id.cmp(&b.rule_id))
    });
}
