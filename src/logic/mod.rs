//! Logic Module - Scoring Engines
//!
//! Mỗi engine một sub-module: `types.rs` cho data, logic ở file riêng.
//!
//! ## Structure
//! - `context/` - Transaction intake + feature context builder
//! - `velocity/` - Windowed per-subject aggregates
//! - `signals/` - External device / network / identity / consortium lookups
//! - `rules/` - Rule catalog, declarative loader, fail-open evaluation
//! - `policy/` - Per-vertical thresholds, weights, toggles, hot-reload
//! - `model/` - Feature layout + ML scoring oracle
//! - `scoring/` - Ensemble aggregation and decision
//! - `storage/` - Decision / outcome persistence
//! - `feedback/` - Outcome sink and calibration summary
//! - `metrics/` - Per-vertical dashboards
//! - `pipeline/` - `RiskEngine` wiring all of the above

pub mod context;
pub mod velocity;
pub mod signals;
pub mod rules;
pub mod policy;
pub mod model;
pub mod scoring;
pub mod storage;
pub mod feedback;
pub mod metrics;
pub mod pipeline;
