//! Context Module - Feature Context Builder
//!
//! One immutable, flat, typed field map per transaction.
//! Rules read it; nothing writes it after build.

pub mod types;
pub mod fields;
pub mod transaction;
pub mod builder;

// Re-export common types
pub use types::{ContextFields, FieldValue, TransactionContext};
pub use transaction::Transaction;
pub use builder::{BuiltContext, FeatureContextBuilder};
