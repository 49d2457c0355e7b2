//! In-memory decision store (tests, replay without a database)

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::StorageResult;

use super::store::DecisionStore;
use super::types::{DecisionRecord, OutcomeRecord};

#[derive(Default)]
pub struct MemoryStore {
    decisions: RwLock<HashMap<String, DecisionRecord>>,
    outcomes: RwLock<HashMap<String, OutcomeRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DecisionStore for MemoryStore {
    fn save_decision(&self, record: &DecisionRecord) -> StorageResult<()> {
        self.decisions
            .write()
            .insert(record.transaction_id().to_string(), record.clone());
        Ok(())
    }

    fn get_decision(&self, transaction_id: &str) -> StorageResult<Option<DecisionRecord>> {
        Ok(self.decisions.read().get(transaction_id).cloned())
    }

    fn save_outcome(&self, outcome: &OutcomeRecord) -> StorageResult<()> {
        self.outcomes
            .write()
            .insert(outcome.transaction_id.clone(), outcome.clone());
        Ok(())
    }

    fn outcomes(&self, vertical: Option<&str>) -> StorageResult<Vec<OutcomeRecord>> {
        let mut out: Vec<OutcomeRecord> = self
            .outcomes
            .read()
            .values()
            .filter(|o| vertical.map_or(true, |v| o.vertical == v))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.transaction_id.cmp(&b.transaction_id));
        Ok(out)
    }

    fn decision_count(&self) -> StorageResult<u64> {
        Ok(self.decisions.read().len() as u64)
    }
}
