//! Scoring Oracle
//!
//! Trait cho model scoring (HTTP, ONNX, ...). The pipeline only ever sees a
//! probability or a [`ModelOutcome`] explaining why there isn't one.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ModelError;
use crate::logic::scoring::ModelOutcome;

use super::layout::FeatureVector;

/// External model: `Predict(features) → probability ∈ [0, 1]`
#[async_trait]
pub trait ModelOracle: Send + Sync {
    fn name(&self) -> &str;

    async fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError>;
}

/// Reject NaN and anything outside [0, 1]
pub fn check_probability(p: f64) -> Result<f64, ModelError> {
    if p.is_finite() && (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(ModelError::InvalidProbability(p))
    }
}

/// Call the oracle under `timeout` and fold every failure into an outcome
pub async fn score_with_timeout(
    oracle: &dyn ModelOracle,
    features: &FeatureVector,
    timeout: Duration,
    transaction_id: &str,
) -> ModelOutcome {
    if timeout.is_zero() {
        tracing::warn!(transaction_id, oracle = oracle.name(), "No time left for model scoring");
        return ModelOutcome::Skipped;
    }

    match tokio::time::timeout(timeout, oracle.predict(features)).await {
        Ok(Ok(p)) => match check_probability(p) {
            Ok(p) => ModelOutcome::Scored(p),
            Err(e) => {
                tracing::warn!(transaction_id, oracle = oracle.name(), error = %e, "Model returned unusable score");
                ModelOutcome::Failed(e.to_string())
            }
        },
        Ok(Err(ModelError::Timeout(_))) | Err(_) => {
            tracing::warn!(
                transaction_id,
                oracle = oracle.name(),
                timeout_ms = timeout.as_millis() as u64,
                "Model scoring timed out, scoring rule-only"
            );
            ModelOutcome::TimedOut
        }
        Ok(Err(e)) => {
            tracing::warn!(transaction_id, oracle = oracle.name(), error = %e, "Model scoring failed, scoring rule-only");
            ModelOutcome::Failed(e.to_string())
        }
    }
}
