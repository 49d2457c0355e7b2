//! Configuration module

use std::path::PathBuf;
use std::time::Duration;

use crate::constants;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Deadline for the whole per-transaction pipeline
    pub deadline: Duration,

    /// Budget for one ML oracle call
    pub model_timeout: Duration,

    /// Budget for one signal provider lookup
    pub signal_timeout: Duration,

    /// Retries after the first failed velocity read
    pub velocity_retries: u32,

    /// Base backoff between velocity attempts
    pub velocity_backoff: Duration,

    /// Number of velocity store shards
    pub velocity_shards: usize,

    /// Vertical policy JSON file
    pub policy_file: Option<PathBuf>,

    /// Declarative rules JSON file
    pub rules_file: Option<PathBuf>,

    /// Watch policy/rules files and hot-reload on change
    pub watch_config: bool,

    /// SQLite database for decisions and outcomes
    pub db_path: PathBuf,

    /// Remote scoring oracle endpoint
    pub model_url: Option<String>,

    /// Local ONNX model, used instead of `model_url` when the feature is built
    pub model_path: Option<PathBuf>,

    /// Device reputation provider base URL
    pub device_signal_url: Option<String>,

    /// IP reputation provider base URL
    pub network_signal_url: Option<String>,

    /// Identity verification provider base URL
    pub identity_signal_url: Option<String>,

    /// Consortium lookup base URL
    pub consortium_url: Option<String>,

    /// Decision recorder queue capacity
    pub recorder_queue: usize,

    /// Log format (json, pretty)
    pub log_format: String,
}

impl EngineConfig {
    /// Load configuration from `.env` (if any) and environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            deadline: Duration::from_millis(constants::get_deadline_ms()),
            model_timeout: Duration::from_millis(constants::get_model_timeout_ms()),
            signal_timeout: Duration::from_millis(constants::get_signal_timeout_ms()),
            velocity_retries: constants::get_velocity_retries(),
            velocity_backoff: Duration::from_millis(constants::get_velocity_backoff_ms()),
            velocity_shards: constants::get_velocity_shards(),
            policy_file: constants::get_policy_file(),
            rules_file: constants::get_rules_file(),
            watch_config: constants::is_config_watch_enabled(),
            db_path: constants::get_db_path(),
            model_url: constants::get_model_url(),
            model_path: constants::get_model_path(),
            device_signal_url: constants::get_device_signal_url(),
            network_signal_url: constants::get_network_signal_url(),
            identity_signal_url: constants::get_identity_signal_url(),
            consortium_url: constants::get_consortium_url(),
            recorder_queue: constants::DEFAULT_RECORDER_QUEUE,
            log_format: constants::get_log_format(),
        }
    }

    /// Check if logs should be emitted as JSON
    pub fn is_json_logging(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_millis(constants::DEFAULT_DEADLINE_MS),
            model_timeout: Duration::from_millis(constants::DEFAULT_MODEL_TIMEOUT_MS),
            signal_timeout: Duration::from_millis(constants::DEFAULT_SIGNAL_TIMEOUT_MS),
            velocity_retries: constants::DEFAULT_VELOCITY_RETRIES,
            velocity_backoff: Duration::from_millis(constants::DEFAULT_VELOCITY_BACKOFF_MS),
            velocity_shards: constants::DEFAULT_VELOCITY_SHARDS,
            policy_file: None,
            rules_file: None,
            watch_config: false,
            db_path: PathBuf::from("decisions.db"),
            model_url: None,
            model_path: None,
            device_signal_url: None,
            network_signal_url: None,
            identity_signal_url: None,
            consortium_url: None,
            recorder_queue: constants::DEFAULT_RECORDER_QUEUE,
            log_format: "pretty".to_string(),
        }
    }
}
