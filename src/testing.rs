//! Test doubles for the external collaborators: scoring oracle, signal
//! providers and velocity store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{ModelError, SignalError, VelocityError};
use crate::logic::model::{FeatureVector, ModelOracle};
use crate::logic::signals::{SignalKind, SignalProvider, SignalValues};
use crate::logic::velocity::{Observation, Subject, SubjectAggregates, VelocityStore};

// ============================================================================
// ORACLES
// ============================================================================

/// Always answers with the same probability
pub struct FixedOracle {
    probability: f64,
    calls: AtomicUsize,
}

impl FixedOracle {
    pub fn new(probability: f64) -> Self {
        Self {
            probability,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelOracle for FixedOracle {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn predict(&self, _: &FeatureVector) -> Result<f64, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.probability)
    }
}

/// Answers after `delay`
pub struct SlowOracle {
    probability: f64,
    delay: Duration,
}

impl SlowOracle {
    pub fn new(probability: f64, delay: Duration) -> Self {
        Self { probability, delay }
    }
}

#[async_trait]
impl ModelOracle for SlowOracle {
    fn name(&self) -> &str {
        "slow"
    }

    async fn predict(&self, _: &FeatureVector) -> Result<f64, ModelError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.probability)
    }
}

pub struct FailingOracle;

#[async_trait]
impl ModelOracle for FailingOracle {
    fn name(&self) -> &str {
        "failing"
    }

    async fn predict(&self, _: &FeatureVector) -> Result<f64, ModelError> {
        Err(ModelError::Transport("connection refused".to_string()))
    }
}

// ============================================================================
// SIGNAL PROVIDERS
// ============================================================================

pub struct SlowSignalProvider {
    name: String,
    kind: SignalKind,
    delay: Duration,
}

impl SlowSignalProvider {
    pub fn new(name: &str, kind: SignalKind, delay: Duration) -> Self {
        Self {
            name: name.to_string(),
            kind,
            delay,
        }
    }
}

#[async_trait]
impl SignalProvider for SlowSignalProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SignalKind {
        self.kind
    }

    async fn lookup(&self, _: &str) -> Result<Option<SignalValues>, SignalError> {
        tokio::time::sleep(self.delay).await;
        Ok(Some(SignalValues::new()))
    }
}

pub struct FailingSignalProvider {
    name: String,
    kind: SignalKind,
}

impl FailingSignalProvider {
    pub fn new(name: &str, kind: SignalKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
        }
    }
}

#[async_trait]
impl SignalProvider for FailingSignalProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SignalKind {
        self.kind
    }

    async fn lookup(&self, _: &str) -> Result<Option<SignalValues>, SignalError> {
        Err(SignalError::Transport("503 from upstream".to_string()))
    }
}

// ============================================================================
// VELOCITY
// ============================================================================

/// Every read fails; counts attempts
#[derive(Default)]
pub struct FailingVelocityStore {
    reads: AtomicUsize,
}

impl FailingVelocityStore {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VelocityStore for FailingVelocityStore {
    async fn aggregates(&self, _: &Subject, _: DateTime<Utc>) -> Result<SubjectAggregates, VelocityError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Err(VelocityError::Unavailable("connection reset".to_string()))
    }

    async fn observe(&self, _: &Observation) -> Result<(), VelocityError> {
        Err(VelocityError::Unavailable("connection reset".to_string()))
    }
}
