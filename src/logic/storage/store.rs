//! Decision Store trait
//!
//! Blocking by contract: callers on the async path go through
//! `spawn_blocking` (see `recorder`).

use crate::error::StorageResult;

use super::types::{DecisionRecord, OutcomeRecord};

pub trait DecisionStore: Send + Sync {
    /// Insert or replace by transaction id
    fn save_decision(&self, record: &DecisionRecord) -> StorageResult<()>;

    fn get_decision(&self, transaction_id: &str) -> StorageResult<Option<DecisionRecord>>;

    /// Insert or replace by transaction id (a relabel overwrites)
    fn save_outcome(&self, outcome: &OutcomeRecord) -> StorageResult<()>;

    /// Ordered by transaction id
    fn outcomes(&self, vertical: Option<&str>) -> StorageResult<Vec<OutcomeRecord>>;

    fn decision_count(&self) -> StorageResult<u64>;
}
