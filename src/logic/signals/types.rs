//! Signal Types
//!
//! External signal providers (device reputation, IP reputation, identity
//! verification, consortium lookup) and the values they return.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SignalError;
use crate::logic::context::{FieldValue, Transaction};

// ============================================================================
// KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Device,
    Network,
    Identity,
    Consortium,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Device => "device",
            SignalKind::Network => "network",
            SignalKind::Identity => "identity",
            SignalKind::Consortium => "consortium",
        }
    }

    /// Namespace applied to returned field names
    pub fn prefix(&self) -> &'static str {
        match self {
            SignalKind::Device => "device_",
            SignalKind::Network => "ip_",
            SignalKind::Identity => "identity_",
            SignalKind::Consortium => "consortium_",
        }
    }

    /// Identifier this kind looks up for a transaction, if the transaction has one
    pub fn identifier<'a>(&self, tx: &'a Transaction) -> Option<&'a str> {
        match self {
            SignalKind::Device => tx.device_id.as_deref(),
            SignalKind::Network => tx.ip_address.as_deref(),
            SignalKind::Identity => Some(tx.user_id.as_str()),
            SignalKind::Consortium => tx.email.as_deref().or(Some(tx.user_id.as_str())),
        }
    }

    /// Prefix a field name unless it already carries this kind's namespace
    pub fn qualify(&self, field: &str) -> String {
        if field.starts_with(self.prefix()) {
            field.to_string()
        } else {
            format!("{}{}", self.prefix(), field)
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// VALUES
// ============================================================================

/// Fields returned by one lookup (unqualified names allowed)
pub type SignalValues = BTreeMap<String, FieldValue>;

/// Parse a flat JSON object into signal values. Non-scalar members are skipped.
pub fn values_from_json(value: &serde_json::Value) -> Result<SignalValues, SignalError> {
    let object = value
        .as_object()
        .ok_or_else(|| SignalError::Malformed("expected a JSON object".to_string()))?;

    let mut out = SignalValues::new();
    for (key, v) in object {
        match FieldValue::from_json(v) {
            Some(fv) => {
                out.insert(key.clone(), fv);
            }
            None => tracing::debug!(field = %key, "Skipping non-scalar signal field"),
        }
    }
    Ok(out)
}

// ============================================================================
// PROVIDER TRAIT
// ============================================================================

/// Upstream signal collaborator. `Ok(None)` means "nothing known", which is
/// not a failure.
#[async_trait]
pub trait SignalProvider: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> SignalKind;

    async fn lookup(&self, identifier: &str) -> Result<Option<SignalValues>, SignalError>;
}
