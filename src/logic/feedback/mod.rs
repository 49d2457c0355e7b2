//! Feedback Module - Outcome Sink
//!
//! Records actual outcomes against predictions for offline recalibration.
//! The recalibration itself lives outside this crate.

pub mod types;
pub mod sink;

pub use types::{FeedbackSummary, RuleFeedback};
pub use sink::{summarize, FeedbackSink};
