//! Snapshot persistence operations.

use rusqlite::Connection;
use vibestack_core::errors::{ExError, ExErrorKind};
use vibestack_core::manifest::{compute_manifest_digest, encode_manifest};
use vibestack_core::{Manifest, Snapshot};

use crate::cas::{BlobKind, FsStore};
use crate::db::now_ms;
use crate::errors::{not_found, sqlite_error, Result};
use crate::repo::SqliteRepo;

/// Persist a manifest to content-addressable storage
///
/// Idempotent: the same manifest always lands under the same digest.
///
/// ## Errors
///
/// - `Serialization`: manifest encoding failed
/// - `Io` / `Persistence`: CAS write failed
pub fn persist_manifest_to_cas(store: &FsStore, manifest: &Manifest) -> Result<String> {
    let bytes = encode_manifest(manifest)
        .map_err(|e| ExError::from(e).with_op("persist_manifest_to_cas"))?;

    let digest = store.write(&bytes, BlobKind::Manifest)?;

    // The CAS key and the manifest digest are the same hash over the same bytes.
    debug_assert_eq!(compute_manifest_digest(manifest).ok().as_deref(), Some(digest.as_str()));

    tracing::debug!(
        digest = %digest,
        size_bytes = bytes.len(),
        file_count = manifest.len(),
        "Persisted manifest to CAS"
    );

    Ok(digest)
}

/// Append a snapshot to a branch's history
///
/// The parent is the branch's current head as read through `conn`. The
/// manifest blob is written before the row is inserted, so no reader can see
/// a snapshot whose manifest is missing. The branch head is **not** moved;
/// callers do that in the same transaction.
///
/// `description` is an optional longer note kept next to `message`.
///
/// ## Errors
///
/// - `NotFound`: the branch does not exist in `project_id`
/// - `Persistence` / `Io`: CAS or database error
pub fn create_snapshot(
    conn: &Connection,
    cas: &FsStore,
    project_id: &str,
    branch_id: &str,
    message: &str,
    description: Option<&str>,
    manifest: &Manifest,
) -> Result<Snapshot> {
    let branch = SqliteRepo::get_branch(conn, branch_id)?
        .filter(|b| b.project_id == project_id)
        .ok_or_else(|| {
            not_found("create_snapshot", "branch", branch_id).with_project_id(project_id)
        })?;

    let manifest_digest = persist_manifest_to_cas(cas, manifest)?;

    let snapshot = Snapshot {
        id: uuid::Uuid::now_v7().to_string(),
        project_id: project_id.to_string(),
        branch_id: branch.id.clone(),
        parent_id: branch.head_snapshot_id.clone(),
        message: message.to_string(),
        description: description.map(str::to_string),
        manifest: manifest.clone(),
        manifest_digest,
        created_at: now_ms(),
    };

    conn.execute(
        "INSERT INTO snapshots (id, project_id, branch_id, parent_id, message,
                                description, manifest_digest, file_count, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            snapshot.id,
            snapshot.project_id,
            snapshot.branch_id,
            snapshot.parent_id,
            snapshot.message,
            snapshot.description,
            snapshot.manifest_digest,
            manifest.len() as i64,
            snapshot.created_at,
        ],
    )
    .map_err(|e| {
        ExError::new(ExErrorKind::Persistence)
            .with_op("create_snapshot")
            .with_project_id(project_id)
            .with_branch(branch.name.clone())
            .with_source(sqlite_error("insert_snapshot", e))
            .with_message("failed to insert snapshot")
    })?;

    tracing::debug!(
        snapshot_id = %snapshot.id,
        parent_id = ?snapshot.parent_id,
        branch = %branch.name,
        "Created snapshot"
    );

    Ok(snapshot)
}
