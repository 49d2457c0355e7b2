//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Every default can be overridden by the matching `RISK_*` environment variable.

use std::path::PathBuf;

/// Whole-pipeline deadline per transaction (milliseconds)
pub const DEFAULT_DEADLINE_MS: u64 = 50;

/// Budget for one call to the ML scoring oracle (milliseconds)
pub const DEFAULT_MODEL_TIMEOUT_MS: u64 = 25;

/// Budget for one signal provider lookup (milliseconds)
pub const DEFAULT_SIGNAL_TIMEOUT_MS: u64 = 15;

/// Retries after the first failed velocity read
pub const DEFAULT_VELOCITY_RETRIES: u32 = 2;

/// Base backoff between velocity read attempts (milliseconds)
pub const DEFAULT_VELOCITY_BACKOFF_MS: u64 = 2;

/// Number of independently locked velocity shards
pub const DEFAULT_VELOCITY_SHARDS: usize = 16;

/// Bounded queue between the request path and the decision writer
pub const DEFAULT_RECORDER_QUEUE: usize = 4096;

/// Default ensemble blend (rule share)
pub const DEFAULT_RULE_WEIGHT: f64 = 0.6;

/// Default ensemble blend (model share)
pub const DEFAULT_MODEL_WEIGHT: f64 = 0.4;

/// Default score at or above which a transaction is declined
pub const DEFAULT_DECLINE_THRESHOLD: u32 = 70;

/// Default score at or above which a transaction goes to review
pub const DEFAULT_REVIEW_THRESHOLD: u32 = 50;

/// Name of the fallback policy used for unconfigured verticals
pub const DEFAULT_VERTICAL: &str = "default";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "fraud-risk-core";

// ============================================================================
// Helper functions to read from env with fallback
// ============================================================================

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

pub fn get_deadline_ms() -> u64 {
    env_parse("RISK_DEADLINE_MS", DEFAULT_DEADLINE_MS)
}

pub fn get_model_timeout_ms() -> u64 {
    env_parse("RISK_MODEL_TIMEOUT_MS", DEFAULT_MODEL_TIMEOUT_MS)
}

pub fn get_signal_timeout_ms() -> u64 {
    env_parse("RISK_SIGNAL_TIMEOUT_MS", DEFAULT_SIGNAL_TIMEOUT_MS)
}

pub fn get_velocity_retries() -> u32 {
    env_parse("RISK_VELOCITY_RETRIES", DEFAULT_VELOCITY_RETRIES)
}

pub fn get_velocity_backoff_ms() -> u64 {
    env_parse("RISK_VELOCITY_BACKOFF_MS", DEFAULT_VELOCITY_BACKOFF_MS)
}

pub fn get_velocity_shards() -> usize {
    env_parse("RISK_VELOCITY_SHARDS", DEFAULT_VELOCITY_SHARDS).max(1)
}

pub fn get_policy_file() -> Option<PathBuf> {
    env_opt("RISK_POLICY_FILE").map(PathBuf::from)
}

pub fn get_rules_file() -> Option<PathBuf> {
    env_opt("RISK_RULES_FILE").map(PathBuf::from)
}

/// Decision database path from environment, or the per-user data directory
pub fn get_db_path() -> PathBuf {
    env_opt("RISK_DB_PATH").map(PathBuf::from).unwrap_or_else(|| {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fraud-risk")
            .join("decisions.db")
    })
}

pub fn get_model_url() -> Option<String> {
    env_opt("RISK_MODEL_URL")
}

/// Local ONNX model file (requires the `onnx` feature)
pub fn get_model_path() -> Option<PathBuf> {
    env_opt("RISK_MODEL_PATH").map(PathBuf::from)
}

pub fn get_device_signal_url() -> Option<String> {
    env_opt("RISK_DEVICE_SIGNAL_URL")
}

pub fn get_network_signal_url() -> Option<String> {
    env_opt("RISK_NETWORK_SIGNAL_URL")
}

pub fn get_identity_signal_url() -> Option<String> {
    env_opt("RISK_IDENTITY_SIGNAL_URL")
}

pub fn get_consortium_url() -> Option<String> {
    env_opt("RISK_CONSORTIUM_URL")
}

pub fn get_log_format() -> String {
    env_opt("RISK_LOG_FORMAT").unwrap_or_else(|| "pretty".to_string())
}

/// Check if config files should be watched for changes
pub fn is_config_watch_enabled() -> bool {
    std::env::var("RISK_WATCH_CONFIG")
        .map(|s| s.to_lowercase() != "false" && s != "0")
        .unwrap_or(true)
}
