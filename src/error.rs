//! Error handling
//!
//! One error enum per component. Only [`RiskError`] ever reaches the caller of
//! `check_transaction`; everything else is absorbed into the decision as a
//! degradation or rejected at load/update time.

use std::time::Duration;
use thiserror::Error;

pub type RiskResult<T> = Result<T, RiskError>;

// ============================================================================
// CALLER-VISIBLE FAILURE
// ============================================================================

/// The only failure `check_transaction` can return.
#[derive(Debug, Error)]
pub enum RiskError {
    #[error("velocity store unavailable after {attempts} attempt(s): {source}")]
    VelocityUnavailable {
        attempts: u32,
        #[source]
        source: VelocityError,
    },
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Fatal at load/update time, never raised on the request path.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("duplicate rule id '{0}'")]
    DuplicateRule(String),

    #[error("unknown rule id '{0}'")]
    UnknownRule(String),

    #[error("invalid thresholds for vertical '{vertical}': decline {decline} < review {review}")]
    InvertedThresholds {
        vertical: String,
        decline: u32,
        review: u32,
    },

    #[error("invalid policy for vertical '{vertical}': {reason}")]
    InvalidPolicy { vertical: String, reason: String },

    #[error("invalid rule '{rule_id}': {reason}")]
    InvalidRule { rule_id: String, reason: String },

    #[error("invalid pattern '{pattern}' in rule '{rule_id}': {source}")]
    InvalidPattern {
        rule_id: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),
}

// ============================================================================
// RULE EVALUATION
// ============================================================================

/// Isolated per rule: logged, treated as non-triggering, never propagated.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RuleError {
    #[error("field '{field}' has type {found}, expected {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("rule panicked: {0}")]
    Panicked(String),
}

// ============================================================================
// EXTERNAL COLLABORATORS
// ============================================================================

/// Signal provider failure. The field becomes absent in the context.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("signal lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("signal transport error: {0}")]
    Transport(String),

    #[error("malformed signal payload: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for SignalError {
    fn from(err: reqwest::Error) -> Self {
        SignalError::Transport(err.to_string())
    }
}

/// Model scoring failure. The ensemble degrades to rule-only.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model scoring timed out after {0:?}")]
    Timeout(Duration),

    #[error("model transport error: {0}")]
    Transport(String),

    #[error("model returned invalid probability {0}")]
    InvalidProbability(f64),

    #[error("feature layout mismatch: expected hash {expected:08x}, model has {found:08x}")]
    LayoutMismatch { expected: u32, found: u32 },

    #[error("model not loaded: {0}")]
    NotLoaded(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

impl From<reqwest::Error> for ModelError {
    fn from(err: reqwest::Error) -> Self {
        ModelError::Transport(err.to_string())
    }
}

/// Velocity store failure. The only input allowed to fail a request.
#[derive(Debug, Clone, Error)]
pub enum VelocityError {
    #[error("velocity backend unavailable: {0}")]
    Unavailable(String),

    #[error("velocity read timed out after {0:?}")]
    Timeout(Duration),
}

// ============================================================================
// STORAGE
// ============================================================================

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no decision recorded for transaction '{0}'")]
    NotFound(String),

    #[error("storage task failed: {0}")]
    Task(String),
}

pub type StorageResult<T> = Result<T, StorageError>;
