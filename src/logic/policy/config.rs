//! Policy Configuration
//!
//! Built-in vertical presets and the on-disk policy file.
//! Can be loaded from config file or set at runtime.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use super::types::{PolicySnapshot, VerticalPolicy};

// ============================================================================
// BUILT-IN VERTICALS
// ============================================================================

/// Verticals that ship with a tuned policy
pub const BUILTIN_VERTICALS: [&str; 6] = ["default", "lending", "crypto", "ecommerce", "gaming", "fintech"];

/// Preset for a known vertical, or None
pub fn preset(vertical: &str) -> Option<VerticalPolicy> {
    let policy = match vertical {
        "default" => VerticalPolicy::new("default"),

        "lending" => VerticalPolicy::new("lending")
            .with_thresholds(70, 50)
            .with_weight("LOAN_STACKING", 1.2)
            .with_weight("CONSORTIUM_MULTI_CLIENT", 1.3),

        "crypto" => VerticalPolicy::new("crypto")
            .with_thresholds(65, 45)
            .with_weight("MIXER_DESTINATION", 1.5)
            .with_weight("TOR_EXIT_NODE", 1.2)
            .with_ensemble(0.5, 0.5),

        "ecommerce" => VerticalPolicy::new("ecommerce")
            .with_thresholds(75, 55)
            .with_weight("GEO_MISMATCH", 0.7)
            .with_weight("NIGHT_TIME_ACTIVITY", 0.5)
            .with_disabled("ROUND_AMOUNT"),

        "gaming" => VerticalPolicy::new("gaming")
            .with_thresholds(80, 60)
            .with_weight("DEVICE_MULTI_ACCOUNT", 1.3)
            .with_weight("NIGHT_TIME_ACTIVITY", 0.0),

        "fintech" => VerticalPolicy::new("fintech")
            .with_thresholds(70, 50)
            .with_weight("NEW_PAYEE_LARGE_TRANSFER", 1.2),

        _ => return None,
    };
    Some(policy)
}

/// Snapshot holding every built-in vertical
pub fn builtin_snapshot() -> PolicySnapshot {
    BUILTIN_VERTICALS
        .iter()
        .filter_map(|v| preset(v))
        .fold(PolicySnapshot::default(), |snapshot, policy| snapshot.with_policy(policy))
}

// ============================================================================
// POLICY FILE
// ============================================================================

/// On-disk policy file. Verticals listed here replace the built-in preset of
/// the same name; other presets stay as shipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyFile {
    #[serde(default)]
    pub verticals: Vec<VerticalPolicy>,
    #[serde(default)]
    pub disabled_rules: BTreeSet<String>,
    #[serde(default)]
    pub enabled_rules: BTreeSet<String>,
}

impl PolicyFile {
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

    /// Merge over the built-in presets and validate
    pub fn into_snapshot(self) -> Result<PolicySnapshot, ConfigError> {
        let mut seen = BTreeSet::new();
        let mut snapshot = builtin_snapshot();

        for policy in self.verticals {
            if !seen.insert(policy.vertical.clone()) {
                return Err(ConfigError::InvalidPolicy {
                    vertical: policy.vertical,
                    reason: "listed more than once".to_string(),
                });
            }
            policy.validate()?;
            snapshot = snapshot.with_policy(policy);
        }
        snapshot.globally_disabled = self.disabled_rules;
        snapshot.globally_enabled = self.enabled_rules;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

// ============================================================================
// TESTS
// ============================================================================
