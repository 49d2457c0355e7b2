//! Pipeline Module - Risk Engine
//!
//! Wires context building, rule evaluation, model scoring and the ensemble
//! into the exposed operations.
//!
//! ## Usage
//! ```ignore
//! let engine = RiskEngine::builder().with_oracle(oracle).build()?;
//! let decision = engine.check_transaction(&tx).await?;
//! ```

pub mod engine;

#[cfg(test)]
mod tests;

pub use engine::{EngineStats, RiskEngine, RiskEngineBuilder};
