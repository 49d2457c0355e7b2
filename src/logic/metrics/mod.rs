//! Metrics Module - Vertical Dashboards
//!
//! Read-only volume / decision-rate / top-flag aggregates per vertical.

pub mod types;
pub mod registry;

pub use types::{FlagCount, MetricsPeriod, VerticalMetrics, TOP_FLAGS_LIMIT};
pub use registry::MetricsRegistry;
