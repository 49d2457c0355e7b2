//! Signal collection
//!
//! Fans out to every provider concurrently, each under its own timeout.
//! A failed or slow provider only costs its own fields.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use crate::error::SignalError;
use crate::logic::context::{FieldValue, Transaction};

use super::types::SignalProvider;

/// Merged result of one fan-out
#[derive(Debug, Default)]
pub struct CollectedSignals {
    /// Qualified field name → value, in provider-name order
    pub fields: Vec<(String, FieldValue)>,
    /// Providers that timed out or errored
    pub unavailable: Vec<String>,
}

/// Query every applicable provider for `tx`
pub async fn collect_signals(
    providers: &[Arc<dyn SignalProvider>],
    tx: &Transaction,
    timeout: Duration,
) -> CollectedSignals {
    let mut set = JoinSet::new();

    for provider in providers {
        let Some(identifier) = provider.kind().identifier(tx) else {
            continue;
        };
        let provider = provider.clone();
        let identifier = identifier.to_string();

        set.spawn(async move {
            let result = match tokio::time::timeout(timeout, provider.lookup(&identifier)).await {
                Ok(r) => r,
                Err(_) => Err(SignalError::Timeout(timeout)),
            };
            (provider, result)
        });
    }

    let mut answered = Vec::new();
    let mut unavailable = Vec::new();

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((provider, Ok(Some(values)))) => answered.push((provider, values)),
            Ok((_, Ok(None))) => {}
            Ok((provider, Err(e))) => {
                tracing::debug!(
                    provider = provider.name(),
                    kind = %provider.kind(),
                    error = %e,
                    "Signal provider unavailable"
                );
                unavailable.push(provider.name().to_string());
            }
            Err(e) => {
                tracing::debug!(error = %e, "Signal lookup task aborted");
                unavailable.push("unknown".to_string());
            }
        }
    }

    // completion order is arbitrary; merge in a fixed order
    answered.sort_by(|a, b| a.0.name().cmp(b.0.name()));
    unavailable.sort();

    let mut fields = Vec::new();
    for (provider, values) in answered {
        for (name, value) in values {
            fields.push((provider.kind().qualify(&name), value));
        }
    }

    CollectedSignals { fields, unavailable }
}
