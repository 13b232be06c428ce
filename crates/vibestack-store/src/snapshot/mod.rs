//! Snapshot persistence layer.
//!
//! ## Responsibilities
//!
//! - Persist manifests to CAS under their digest
//! - Create immutable snapshot rows linked to the branch head as parent
//! - Resolve snapshots and walk branch history lazily
//!
//! ## Non-Responsibilities
//!
//! - Moving branch heads (handled by `vibestack-engine` via
//!   [`crate::SqliteRepo::compare_and_set_head`])
//! - Manifest construction (handled by `vibestack-core`)

pub mod persist;
pub mod query;

pub use persist::{create_snapshot, persist_manifest_to_cas};
pub use query::{
    fetch_snapshot_row, get_history, get_snapshot, load_manifest, History, HistoryIter,
    SnapshotRow,
};
