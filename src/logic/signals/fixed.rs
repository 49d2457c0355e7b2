//! Static signal provider
//!
//! In-memory lookup table. Used for allow/deny lists loaded at startup and
//! as the provider double in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::SignalError;

use super::types::{SignalKind, SignalProvider, SignalValues};

pub struct StaticSignalProvider {
    name: String,
    kind: SignalKind,
    table: RwLock<HashMap<String, SignalValues>>,
}

impl StaticSignalProvider {
    pub fn new(name: &str, kind: SignalKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            table: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_entry(self, identifier: &str, values: SignalValues) -> Self {
        self.insert(identifier, values);
        self
    }

    pub fn insert(&self, identifier: &str, values: SignalValues) {
        self.table.write().insert(identifier.to_string(), values);
    }

    pub fn remove(&self, identifier: &str) -> bool {
        self.table.write().remove(identifier).is_some()
    }
}

#[async_trait]
impl SignalProvider for StaticSignalProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SignalKind {
        self.kind
    }

    async fn lookup(&self, identifier: &str) -> Result<Option<SignalValues>, SignalError> {
        Ok(self.table.read().get(identifier).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::context::FieldValue;

    #[tokio::test]
    async fn test_static_lookup() {
        let mut values = SignalValues::new();
        values.insert("tor".to_string(), FieldValue::Bool(true));
        let provider = StaticSignalProvider::new("tor-list", SignalKind::Network)
            .with_entry("198.51.100.9", values);

        let hit = provider.lookup("198.51.100.9").await.unwrap();
        assert_eq!(hit.unwrap().get("tor"), Some(&FieldValue::Bool(true)));
        assert!(provider.lookup("10.0.0.1").await.unwrap().is_none());
    }
}
