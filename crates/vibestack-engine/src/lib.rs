//! vibestack engine - orchestration layer
//!
//! Coordinates the in-memory domain (`vibestack-core`) with persistence
//! (`vibestack-store`): checkpoint, restore and fork on branches, plus the
//! deployment lifecycle around the publish collaborator.

pub mod commands;
pub mod config;

pub use commands::branch::{checkpoint, fork, restore, CheckpointOptions};
pub use commands::deploy::{
    DirectoryPublisher, PublishError, PublishReceipt, PublishTarget, Publisher,
};
pub use commands::engine_command::{
    apply_engine_command, EngineCommand, EngineCommandResult, EngineContext,
};
pub use config::EngineConfig;
pub use vibestack_core_types::{RequestContext, RequestId};
