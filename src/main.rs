//! Risk Screen - JSONL screening harness
//!
//! Reads one `op`-tagged request per line (file argument or stdin) and writes
//! one JSON response per line to stdout. Logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fraud_risk_core::api;
use fraud_risk_core::config::EngineConfig;
use fraud_risk_core::logic::model::HttpModelOracle;
use fraud_risk_core::logic::signals::{HttpSignalProvider, SignalKind};
use fraud_risk_core::logic::storage::SqliteStore;
use fraud_risk_core::logic::velocity::{InMemoryVelocityStore, RetryPolicy};
use fraud_risk_core::RiskEngine;

const PURGE_INTERVAL: Duration = Duration::from_secs(300);

fn init_tracing(config: &EngineConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fraud_risk_core=info,risk_screen=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if config.is_json_logging() {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn build_engine(config: &EngineConfig, velocity: Arc<InMemoryVelocityStore>) -> Result<RiskEngine> {
    let mut builder = RiskEngine::builder()
        .with_velocity_store(velocity)
        .with_deadline(config.deadline)
        .with_model_timeout(config.model_timeout)
        .with_signal_timeout(config.signal_timeout)
        .with_retry(RetryPolicy::new(config.velocity_retries, config.velocity_backoff))
        .with_recorder_queue(config.recorder_queue);

    if let Some(url) = &config.model_url {
        let oracle = HttpModelOracle::new(url, config.model_timeout)
            .with_context(|| format!("model oracle at {}", url))?;
        builder = builder.with_oracle(Arc::new(oracle));
    }

    #[cfg(feature = "onnx")]
    if let Some(path) = &config.model_path {
        let oracle = fraud_risk_core::logic::model::OnnxModelOracle::load(path)
            .with_context(|| format!("ONNX model at {}", path.display()))?;
        builder = builder.with_oracle(Arc::new(oracle));
    }

    let providers = [
        ("device", SignalKind::Device, &config.device_signal_url),
        ("network", SignalKind::Network, &config.network_signal_url),
        ("identity", SignalKind::Identity, &config.identity_signal_url),
        ("consortium", SignalKind::Consortium, &config.consortium_url),
    ];
    for (name, kind, url) in providers {
        let Some(url) = url else { continue };
        let provider = HttpSignalProvider::new(name, kind, url, config.signal_timeout)
            .with_context(|| format!("{} signal provider at {}", name, url))?;
        builder = builder.with_signal_provider(Arc::new(provider));
    }

    let store = SqliteStore::open(&config.db_path)
        .with_context(|| format!("decision database at {}", config.db_path.display()))?;
    builder = builder.with_store(Arc::new(store));

    if let Some(path) = &config.policy_file {
        builder = builder.with_policy_file(path.clone());
    }
    if let Some(path) = &config.rules_file {
        builder = builder.with_rules_file(path.clone());
    }

    Ok(builder.build()?)
}

/// Drop idle velocity subjects. Live traffic only: replayed history is
/// timestamped in the past and would be purged by the wall clock.
fn spawn_purge(velocity: Arc<InMemoryVelocityStore>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            let purged = velocity.purge_expired(chrono::Utc::now());
            tracing::debug!(purged, remaining = velocity.len(), "Velocity purge");
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = EngineConfig::from_env();
    init_tracing(&config);

    let input = std::env::args().nth(1).map(PathBuf::from);
    tracing::info!(
        version = fraud_risk_core::constants::APP_VERSION,
        input = input.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "stdin".into()),
        "Starting risk-screen"
    );

    let velocity = Arc::new(InMemoryVelocityStore::new(config.velocity_shards));
    let engine = Arc::new(build_engine(&config, velocity.clone())?);

    let _watcher = if config.watch_config {
        engine.watch_config()?
    } else {
        None
    };

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("opening {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };
    let purge = input.is_none().then(|| spawn_purge(velocity));

    let mut lines = reader.lines();
    let mut stdout = tokio::io::stdout();
    let mut handled = 0u64;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let response = api::v1::dispatch_line(&engine, line).await;
        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        stdout.write_all(&out).await?;
        handled += 1;
    }
    stdout.flush().await?;

    if let Some(purge) = purge {
        purge.abort();
    }
    engine.flush().await;

    let stats = engine.stats();
    tracing::info!(
        requests = handled,
        recorded = stats.recorder.recorded,
        dropped = stats.recorder.dropped,
        failed = stats.recorder.failed,
        "Screening finished"
    );
    Ok(())
}
