//! Command orchestration layer.
//!
//! High-level functions coordinating core domain logic and the store. These
//! are the only mutation entry points; all of them return plain records.

pub mod branch;
pub mod deploy;
pub mod engine_command;
