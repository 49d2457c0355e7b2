//! Rule Catalog
//!
//! Immutable registry of rules keyed by id. Duplicate ids are rejected when
//! the catalog is built; once built it is only ever replaced, never edited.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::ConfigError;

use super::builtin;
use super::loader::RuleDefinition;
use super::types::{Rule, RuleMeta};

// ============================================================================
// CATALOG
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct RuleCatalog {
    /// Sorted by id
    rules: Vec<Rule>,
    index: HashMap<String, usize>,
}

impl RuleCatalog {
    pub fn builder() -> RuleCatalogBuilder {
        RuleCatalogBuilder::default()
    }

    /// Catalog of all native rules
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::builder().with_rules(builtin::all_rules())?.build()
    }

    /// Native rules plus config-declared ones
    pub fn with_definitions(definitions: &[RuleDefinition]) -> Result<Self, ConfigError> {
        let mut builder = Self::builder().with_rules(builtin::all_rules())?;
        for def in definitions {
            builder = builder.add(def.compile()?)?;
        }
        builder.build()
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.index.get(id).map(|&i| &self.rules[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn metas(&self) -> Vec<RuleMeta> {
        self.rules.iter().map(|r| r.meta.clone()).collect()
    }

    /// Rules whose vertical set admits `vertical` (enablement not considered)
    pub fn for_vertical<'a>(&'a self, vertical: &'a str) -> impl Iterator<Item = &'a Rule> + 'a {
        self.rules.iter().filter(move |r| r.meta.applies_to(vertical))
    }
}

// ============================================================================
// BUILDER
// ============================================================================

#[derive(Debug, Default)]
pub struct RuleCatalogBuilder {
    rules: Vec<Rule>,
    seen: HashMap<String, usize>,
}

impl RuleCatalogBuilder {
    pub fn add(mut self, rule: Rule) -> Result<Self, ConfigError> {
        let id = rule.id().to_string();
        if id.trim().is_empty() {
            return Err(ConfigError::InvalidRule {
                rule_id: id,
                reason: "empty rule id".to_string(),
            });
        }
        if self.seen.contains_key(&id) {
            return Err(ConfigError::DuplicateRule(id));
        }
        self.seen.insert(id, self.rules.len());
        self.rules.push(rule);
        Ok(self)
    }

    pub fn with_rules(mut self, rules: Vec<Rule>) -> Result<Self, ConfigError> {
        for rule in rules {
            self = self.add(rule)?;
        }
        Ok(self)
    }

    pub fn build(self) -> Result<RuleCatalog, ConfigError> {
        let mut rules = self.rules;
        rules.sort_by(|a, b| a.meta.id.cmp(&b.meta.id));
        let index = rules
            .iter()
            .enumerate()
            .map(|(i, r)| (r.meta.id.clone(), i))
            .collect();
        Ok(RuleCatalog { rules, index })
    }
}

// ============================================================================
// LIVE CATALOG (hot-swap)
// ============================================================================

/// Holds the active catalog. Readers clone the `Arc` and keep evaluating
/// against it even if a reload lands mid-request.
pub struct CatalogStore {
    current: RwLock<Arc<RuleCatalog>>,
}

impl CatalogStore {
    pub fn new(catalog: RuleCatalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    pub fn load(&self) -> Arc<RuleCatalog> {
        self.current.read().clone()
    }

    pub fn swap(&self, catalog: RuleCatalog) -> Arc<RuleCatalog> {
        let next = Arc::new(catalog);
        let previous = std::mem::replace(&mut *self.current.write(), next);
        tracing::info!(rules = self.current.read().len(), "Rule catalog swapped");
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuleError;
    use crate::logic::context::TransactionContext;
    use crate::logic::rules::types::{RuleCategory, RuleHit, Severity};

    fn noop(_: &TransactionContext) -> Result<Option<RuleHit>, RuleError> {
        Ok(None)
    }

    fn rule(id: &str) -> Rule {
        Rule::native(RuleMeta::new(id, id, RuleCategory::Custom, Severity::Low, 1), noop)
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let err = RuleCatalog::builder()
            .add(rule("A"))
            .unwrap()
            .add(rule("A"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateRule(id) if id == "A"));
    }

    #[test]
    fn test_builtin_catalog_has_unique_ids() {
        let catalog = RuleCatalog::builtin().unwrap();
        assert!(catalog.len() >= 40);
        assert!(catalog.contains("NEW_ACCOUNT_LARGE_AMOUNT"));
        assert!(catalog.contains("HIGH_VELOCITY"));
    }

    #[test]
    fn test_sorted_iteration() {
        let catalog = RuleCatalog::builder()
            .with_rules(vec![rule("C"), rule("A"), rule("B")])
            .unwrap()
            .build()
            .unwrap();
        let ids: Vec<&str> = catalog.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
        assert_eq!(catalog.get("B").map(|r| r.id()), Some("B"));
    }

    #[test]
    fn test_swap_keeps_old_snapshot_alive() {
        let store = CatalogStore::new(RuleCatalog::default());
        let before = store.load();
        store.swap(RuleCatalog::builder().add(rule("A")).unwrap().build().unwrap());

        assert!(before.is_empty());
        assert_eq!(store.load().len(), 1);
    }
}
