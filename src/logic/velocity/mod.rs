//! Velocity Module - Per-subject time-windowed aggregates
//!
//! Counts, sums and distinct secondary identifiers per (subject, window).
//! Read before scoring, written after scoring, never the other way round.

pub mod types;
pub mod buckets;
pub mod store;


// Re-export common types
pub use types::{
    Observation, Subject, SubjectAggregates, SubjectKind, VelocityAggregate, VelocityMetric,
    Window,
};
pub use store::{aggregates_with_retry, InMemoryVelocityStore, RetryPolicy, VelocityStore};
