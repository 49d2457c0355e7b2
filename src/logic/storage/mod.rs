//! Storage Module - Decision & Outcome Persistence
//!
//! One record per transaction: full DecisionResult plus the context snapshot
//! it was scored from, so audits and feedback never re-derive velocity.
//!
//! ## Structure
//! - `types`: DecisionRecord, OutcomeRecord
//! - `store`: DecisionStore trait
//! - `memory`: In-memory store
//! - `sqlite`: SQLite store (rusqlite)
//! - `recorder`: Async best-effort writer

pub mod types;
pub mod store;
pub mod memory;
pub mod sqlite;
pub mod recorder;


pub use types::{DecisionRecord, OutcomeRecord};
pub use store::DecisionStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use recorder::{DecisionRecorder, RecorderStats};
