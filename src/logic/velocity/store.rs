//! Velocity Store
//!
//! Async read/write interface plus the sharded in-memory implementation.
//! Writes for one subject only ever take that subject's shard lock.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::Rng;

use crate::error::{RiskError, VelocityError};

use super::buckets::SubjectState;
use super::types::{Observation, Subject, SubjectAggregates};

// ============================================================================
// TRAIT
// ============================================================================

/// Backing store for per-subject velocity aggregates
#[async_trait]
pub trait VelocityStore: Send + Sync {
    /// Aggregates for every window, evaluated as of `as_of`
    async fn aggregates(
        &self,
        subject: &Subject,
        as_of: DateTime<Utc>,
    ) -> Result<SubjectAggregates, VelocityError>;

    /// Record a scored transaction against all subjects it touches
    async fn observe(&self, observation: &Observation) -> Result<(), VelocityError>;
}

// ============================================================================
// IN-MEMORY SHARDED STORE
// ============================================================================

type Shard = Mutex<HashMap<Subject, SubjectState>>;

/// Sharded in-process store. Subjects are spread over shards by CRC32 of
/// their key, so writers for different subjects rarely contend.
pub struct InMemoryVelocityStore {
    shards: Vec<Shard>,
}

impl InMemoryVelocityStore {
    pub fn new(shards: usize) -> Self {
        let shards = shards.max(1);
        Self {
            shards: (0..shards).map(|_| Mutex::new(HashMap::new())).collect(),
        }
    }

    fn shard(&self, subject: &Subject) -> &Shard {
        let hash = crc32fast::hash(subject.key().as_bytes()) as usize;
        &self.shards[hash % self.shards.len()]
    }

    /// Drop subjects with nothing left in their longest window.
    /// Returns the number of subjects removed.
    pub fn purge_expired(&self, as_of: DateTime<Utc>) -> usize {
        let mut removed = 0;
        for shard in &self.shards {
            let mut map = shard.lock();
            let before = map.len();
            map.retain(|_, state| !state.is_expired(as_of));
            removed += before - map.len();
        }
        if removed > 0 {
            tracing::debug!(removed, "Purged expired velocity subjects");
        }
        removed
    }

    /// Number of tracked subjects
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryVelocityStore {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_VELOCITY_SHARDS)
    }
}

#[async_trait]
impl VelocityStore for InMemoryVelocityStore {
    async fn aggregates(
        &self,
        subject: &Subject,
        as_of: DateTime<Utc>,
    ) -> Result<SubjectAggregates, VelocityError> {
        let map = self.shard(subject).lock();
        Ok(map
            .get(subject)
            .map(|state| state.aggregates(as_of))
            .unwrap_or_default())
    }

    async fn observe(&self, observation: &Observation) -> Result<(), VelocityError> {
        for (subject, secondary) in observation.subjects() {
            let mut map = self.shard(&subject).lock();
            map.entry(subject)
                .or_insert_with(|| SubjectState::new(observation.timestamp))
                .record(observation.timestamp, observation.amount, secondary);
        }
        Ok(())
    }
}

// ============================================================================
// RETRY
// ============================================================================

/// Short retry budget for velocity reads
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub retries: u32,
    /// Base backoff; attempt n waits base * 2^n plus up to base of jitter
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32, backoff: Duration) -> Self {
        Self { retries, backoff }
    }

    fn delay(&self, attempt: u32) -> Duration {
        let base = self.backoff.as_micros() as u64;
        let exp = base.saturating_mul(1u64 << attempt.min(8));
        let jitter = if base > 0 {
            rand::thread_rng().gen_range(0..=base)
        } else {
            0
        };
        Duration::from_micros(exp + jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: crate::constants::DEFAULT_VELOCITY_RETRIES,
            backoff: Duration::from_millis(crate::constants::DEFAULT_VELOCITY_BACKOFF_MS),
        }
    }
}

/// Read with retries. Exhaustion is the one failure surfaced to callers.
pub async fn aggregates_with_retry(
    store: &dyn VelocityStore,
    subject: &Subject,
    as_of: DateTime<Utc>,
    policy: RetryPolicy,
) -> Result<SubjectAggregates, RiskError> {
    let mut attempt = 0;
    loop {
        match store.aggregates(subject, as_of).await {
            Ok(aggs) => return Ok(aggs),
            Err(e) if attempt < policy.retries => {
                tracing::debug!(subject = %subject.kind, attempt, error = %e, "Velocity read failed, retrying");
                tokio::time::sleep(policy.delay(attempt)).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(subject = %subject.kind, attempts = attempt + 1, error = %e, "Velocity store unavailable");
                return Err(RiskError::VelocityUnavailable {
                    attempts: attempt + 1,
                    source: e,
                });
            }
        }
    }
}
