//! Fraud Risk Core
//!
//! Real-time transaction risk scoring: feature context, fail-open rules,
//! per-vertical policy and a rule/model ensemble, with decision persistence,
//! outcome feedback and vertical dashboards.
//!
//! ## Usage
//! ```ignore
//! let engine = RiskEngine::builder().build()?;
//! let decision = engine.check_transaction(&tx).await?;
//! ```

pub mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod logic;

#[cfg(test)]
pub mod testing;

pub use config::EngineConfig;
pub use error::{ConfigError, RiskError, RiskResult};
pub use logic::context::Transaction;
pub use logic::pipeline::{RiskEngine, RiskEngineBuilder};
pub use logic::scoring::{Decision, DecisionResult, RiskLevel};
