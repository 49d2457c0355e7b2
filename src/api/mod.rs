//! API Module
//!
//! Organized with versioning for backward compatibility.
//!
//! Structure:
//! - commands.rs: Current stable operations (CheckTransaction, admin, feedback)
//! - engine_status.rs: Layout / catalog / recorder snapshot
//! - v1/mod.rs: Re-exports commands as v1 API
//!
//! Usage:
//! - `api::commands::check_transaction(&engine, &tx)` - Direct access
//! - `api::v1::dispatch_line(&engine, line)` - Version 1 JSON surface

pub mod commands;
pub mod engine_status;
pub mod v1;

// Re-export current version as default
pub use commands::*;
pub use engine_status::{EngineStatus, ModelInfo};
