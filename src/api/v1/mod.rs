//! API v1 Module
//!
//! Re-exports the current stable commands. A breaking change to the request
//! shape goes into a new `v2` next to this one.

pub use super::commands::*;
