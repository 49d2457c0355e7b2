//! Rules Module - Rule Catalog & Engine
//!
//! Native rule families plus JSON-declared rules, one id namespace,
//! evaluated fail-open against an immutable context.

pub mod types;
pub mod condition;
pub mod catalog;
pub mod loader;
pub mod engine;
pub mod builtin;

// Re-export common types
pub use types::{Flag, Rule, RuleCategory, RuleFn, RuleHit, RuleLogic, RuleMeta, Severity};
pub use condition::{CompiledCondition, Condition, DeclarativeLogic};
pub use catalog::{CatalogStore, RuleCatalog, RuleCatalogBuilder};
pub use loader::{RuleDefinition, RuleFile};
pub use engine::{evaluate, sort_flags, RuleEvaluation, RuleFailure};
