//! Signals Module - External signal providers
//!
//! Device reputation, IP reputation, identity verification and consortium
//! lookups. Every call is bounded and non-fatal.

pub mod types;
pub mod fixed;
pub mod http;
pub mod collect;

#[cfg(test)]
mod tests;

pub use types::{values_from_json, SignalKind, SignalProvider, SignalValues};
pub use fixed::StaticSignalProvider;
pub use http::HttpSignalProvider;
pub use collect::{collect_signals, CollectedSignals};
