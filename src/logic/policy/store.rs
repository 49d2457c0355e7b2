//! Vertical Policy Store
//!
//! Readers take an `Arc` of the current snapshot (one short read lock, no
//! copying). Writers serialize on a separate mutex, build a new snapshot from
//! the old one and publish it in a single swap.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::ConfigError;
use crate::logic::rules::RuleCatalog;

use super::config::builtin_snapshot;
use super::types::{PolicySnapshot, VerticalPolicy};

pub struct PolicyStore {
    current: RwLock<Arc<PolicySnapshot>>,
    writer: Mutex<()>,
}

impl PolicyStore {
    pub fn new(snapshot: PolicySnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
            writer: Mutex::new(()),
        }
    }

    /// Store seeded with the built-in vertical presets
    pub fn builtin() -> Self {
        Self::new(builtin_snapshot())
    }

    /// Current snapshot; stays valid for the caller even if replaced
    pub fn snapshot(&self) -> Arc<PolicySnapshot> {
        self.current.read().clone()
    }

    /// Policy for a vertical (default policy if unconfigured)
    pub fn get_policy(&self, vertical: &str) -> VerticalPolicy {
        self.snapshot().policy(vertical).clone()
    }

    pub fn version(&self) -> u64 {
        self.current.read().version
    }

    /// Replace one vertical's policy. Returns the new snapshot version.
    pub fn update_policy(
        &self,
        vertical: &str,
        mut policy: VerticalPolicy,
        catalog: &RuleCatalog,
    ) -> Result<u64, ConfigError> {
        if policy.vertical.is_empty() {
            policy.vertical = vertical.to_string();
        }
        if policy.vertical != vertical {
            return Err(ConfigError::InvalidPolicy {
                vertical: vertical.to_string(),
                reason: format!("policy body names vertical '{}'", policy.vertical),
            });
        }
        policy.validate()?;
        check_rule_ids(&policy, catalog)?;

        let version = self.publish(|snapshot| {
            *snapshot = std::mem::take(snapshot).with_policy(policy);
            Ok(())
        })?;
        tracing::info!(vertical, version, "Vertical policy updated");
        Ok(version)
    }

    /// Global toggle for one rule across every vertical
    pub fn set_rule_enabled(
        &self,
        rule_id: &str,
        enabled: bool,
        catalog: &RuleCatalog,
    ) -> Result<u64, ConfigError> {
        let rule = catalog
            .get(rule_id)
            .ok_or_else(|| ConfigError::UnknownRule(rule_id.to_string()))?;
        let default_on = rule.meta.enabled;

        let version = self.publish(|snapshot| {
            let id = rule_id.to_string();
            if enabled {
                snapshot.globally_disabled.remove(&id);
                if !default_on {
                    snapshot.globally_enabled.insert(id);
                }
            } else {
                snapshot.globally_enabled.remove(&id);
                snapshot.globally_disabled.insert(id);
            }
            Ok(())
        })?;
        tracing::info!(rule_id, enabled, version, "Rule toggled");
        Ok(version)
    }

    /// Swap in a whole new snapshot (file reload). Version keeps increasing.
    pub fn replace(&self, snapshot: PolicySnapshot, catalog: &RuleCatalog) -> Result<u64, ConfigError> {
        snapshot.validate()?;
        for id in snapshot.referenced_rules() {
            if !catalog.contains(id) {
                return Err(ConfigError::UnknownRule(id.to_string()));
            }
        }

        let version = self.publish(move |current| {
            *current = snapshot;
            Ok(())
        })?;
        tracing::info!(version, "Policy snapshot replaced");
        Ok(version)
    }

    /// Copy-on-write publish
    fn publish<F>(&self, edit: F) -> Result<u64, ConfigError>
    where
        F: FnOnce(&mut PolicySnapshot) -> Result<(), ConfigError>,
    {
        let _guard = self.writer.lock();
        let current = self.snapshot();

        let mut next = (*current).clone();
        edit(&mut next)?;
        next.version = current.version + 1;
        next.validate()?;

        let version = next.version;
        *self.current.write() = Arc::new(next);
        Ok(version)
    }
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::builtin()
    }
}

fn check_rule_ids(policy: &VerticalPolicy, catalog: &RuleCatalog) -> Result<(), ConfigError> {
    for id in policy.weights.keys().chain(policy.disabled_rules.iter()) {
        if !catalog.contains(id) {
            return Err(ConfigError::UnknownRule(id.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> RuleCatalog {
        RuleCatalog::builtin().unwrap()
    }

    #[test]
    fn test_update_bumps_version_and_keeps_old_snapshot() {
        let store = PolicyStore::builtin();
        let before = store.snapshot();

        let policy = VerticalPolicy::new("crypto").with_thresholds(90, 40);
        let version = store.update_policy("crypto", policy, &catalog()).unwrap();

        assert_eq!(version, before.version + 1);
        assert_eq!(before.policy("crypto").decline_threshold, 65);
        assert_eq!(store.get_policy("crypto").decline_threshold, 90);
    }

    #[test]
    fn test_invalid_update_leaves_store_untouched() {
        let store = PolicyStore::builtin();
        let version = store.version();

        let bad = VerticalPolicy::new("crypto").with_thresholds(30, 60);
        assert!(store.update_policy("crypto", bad, &catalog()).is_err());

        let unknown = VerticalPolicy::new("crypto").with_weight("NOPE", 2.0);
        assert!(matches!(
            store.update_policy("crypto", unknown, &catalog()),
            Err(ConfigError::UnknownRule(_))
        ));
        assert_eq!(store.version(), version);
    }

    #[test]
    fn test_mismatched_vertical_rejected() {
        let store = PolicyStore::builtin();
        let policy = VerticalPolicy::new("gaming");
        assert!(store.update_policy("crypto", policy, &catalog()).is_err());
    }

    #[test]
    fn test_new_vertical_can_be_added() {
        let store = PolicyStore::builtin();
        assert_eq!(store.get_policy("insurance").vertical, "default");

        store
            .update_policy("insurance", VerticalPolicy::new("insurance"), &catalog())
            .unwrap();
        assert_eq!(store.get_policy("insurance").vertical, "insurance");
    }

    #[test]
    fn test_rule_toggle() {
        let store = PolicyStore::builtin();
        let cat = catalog();

        store.set_rule_enabled("ROUND_AMOUNT", false, &cat).unwrap();
        assert!(store.snapshot().globally_disabled.contains("ROUND_AMOUNT"));

        store.set_rule_enabled("ROUND_AMOUNT", true, &cat).unwrap();
        assert!(!store.snapshot().globally_disabled.contains("ROUND_AMOUNT"));
        // shipped enabled, so no override is recorded
        assert!(store.snapshot().globally_enabled.is_empty());

        assert!(matches!(
            store.set_rule_enabled("NOT_A_RULE", false, &cat),
            Err(ConfigError::UnknownRule(_))
        ));
    }
}
