//! vibestack store - persistence layer with SQLite and CAS
//!
//! Provides:
//! - SQLite schema with an embedded, checksummed migrations framework
//! - Content-addressable storage (CAS) for manifest and artifact blobs
//! - Repository functions for projects, working-copy files, branches and
//!   deployments
//! - Snapshot persistence and lazy history walking

pub mod cas;
pub mod db;
pub mod errors;
pub mod migrations;
pub mod repo;
pub mod snapshot;

// Re-export key types
pub use cas::{BlobKind, FsStore};
pub use errors::Result;
pub use repo::SqliteRepo;
pub use snapshot::{create_snapshot, get_history, get_snapshot, History};
