//! Policy Module - Vertical Policy Store
//!
//! Thresholds, rule weights and rule toggles per industry vertical.
//! Read once per transaction from an immutable snapshot; written only by
//! admin updates and config reloads.
//!
//! ## Structure
//! - `types`: VerticalPolicy, EnsembleWeights, PolicySnapshot
//! - `config`: Built-in vertical presets and the policy file
//! - `store`: Copy-on-write snapshot store
//! - `watcher`: Hot-reload of config files
//!
//! ## Usage
//! ```ignore
//! use crate::logic::policy::PolicyStore;
//!
//! let store = PolicyStore::builtin();
//! let snapshot = store.snapshot();
//! let lending = snapshot.policy("lending");
//! assert!(lending.decline_threshold >= lending.review_threshold);
//! ```

pub mod types;
pub mod config;
pub mod store;
pub mod watcher;

// Re-export main types for convenience
pub use types::{EnsembleWeights, PolicySnapshot, VerticalPolicy};
pub use config::{builtin_snapshot, preset, PolicyFile, BUILTIN_VERTICALS};
pub use store::PolicyStore;
pub use watcher::ConfigWatcher;
