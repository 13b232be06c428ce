//! Read-only snapshot queries and lazy history walking.

use std::collections::HashSet;

use rusqlite::{Connection, OptionalExtension, Row};
use vibestack_core::errors::{ExError, ExErrorKind};
use vibestack_core::manifest::decode_manifest;
use vibestack_core::{Manifest, Snapshot};

use crate::cas::FsStore;
use crate::errors::{not_found, sqlite_error, Result};
use crate::repo::SqliteRepo;

/// A raw row from the `snapshots` table (manifest not loaded)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRow {
    pub id: String,
    pub project_id: String,
    pub branch_id: String,
    pub parent_id: Option<String>,
    pub message: String,
    pub description: Option<String>,
    pub manifest_digest: String,
    pub file_count: i64,
    /// Milliseconds since epoch, display only
    pub created_at: i64,
}

fn row_to_snapshot_row(row: &Row<'_>) -> rusqlite::Result<SnapshotRow> {
    Ok(SnapshotRow {
        id: row.get(0)?,
        project_id: row.get(1)?,
        branch_id: row.get(2)?,
        parent_id: row.get(3)?,
        message: row.get(4)?,
        description: row.get(5)?,
        manifest_digest: row.get(6)?,
        file_count: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Fetch a snapshot row by id
pub fn fetch_snapshot_row(conn: &Connection, snapshot_id: &str) -> Result<Option<SnapshotRow>> {
    conn.query_row(
        "SELECT id, project_id, branch_id, parent_id, message, description,
                manifest_digest, file_count, created_at
         FROM snapshots WHERE id = ?1",
        [snapshot_id],
        row_to_snapshot_row,
    )
    .optional()
    .map_err(|e| sqlite_error("fetch_snapshot_row", e))
}

/// Load and decode a manifest blob
///
/// # Errors
///
/// - `MissingBlob` — no CAS blob exists for the digest
/// - `InvalidManifest` — the blob does not decode
pub fn load_manifest(cas: &FsStore, manifest_digest: &str) -> Result<Manifest> {
    let bytes = cas.read(manifest_digest)?;
    decode_manifest(&bytes).map_err(|e| {
        ExError::from(e)
            .with_op("load_manifest")
            .with_entity_id(manifest_digest)
    })
}

fn hydrate(cas: &FsStore, row: SnapshotRow) -> Result<Snapshot> {
    let manifest = load_manifest(cas, &row.manifest_digest)
        .map_err(|e| e.with_project_id(row.project_id.clone()))?;
    Ok(Snapshot {
        id: row.id,
        project_id: row.project_id,
        branch_id: row.branch_id,
        parent_id: row.parent_id,
        message: row.message,
        description: row.description,
        manifest,
        manifest_digest: row.manifest_digest,
        created_at: row.created_at,
    })
}

/// Fetch a snapshot with its manifest
///
/// Returns `Ok(None)` when no row exists.
pub fn get_snapshot(conn: &Connection, cas: &FsStore, snapshot_id: &str) -> Result<Option<Snapshot>> {
    fetch_snapshot_row(conn, snapshot_id)?
        .map(|row| hydrate(cas, row))
        .transpose()
}

/// History of one branch, newest first, walked lazily along parent links
///
/// The head is captured when the history is opened. Each call to
/// [`History::iter`] starts a fresh walk from that head.
pub struct History<'a> {
    conn: &'a Connection,
    cas: &'a FsStore,
    project_id: String,
    branch_name: String,
    head: Option<String>,
}

impl<'a> History<'a> {
    /// Head snapshot id the walk starts from, `None` for an empty branch
    pub fn head(&self) -> Option<&str> {
        self.head.as_deref()
    }

    pub fn iter(&self) -> HistoryIter<'_> {
        HistoryIter {
            conn: self.conn,
            cas: self.cas,
            project_id: &self.project_id,
            branch_name: &self.branch_name,
            next_id: self.head.clone(),
            visited: HashSet::new(),
        }
    }

    /// Walk the whole chain
    ///
    /// # Errors
    ///
    /// Returns the first error the walk hits, typically `BrokenHistory`.
    pub fn to_vec(&self) -> Result<Vec<Snapshot>> {
        self.iter().collect()
    }
}

impl<'h, 'a> IntoIterator for &'h History<'a> {
    type Item = Result<Snapshot>;
    type IntoIter = HistoryIter<'h>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One walk over a [`History`]
///
/// Yields `Err(BrokenHistory)` and then stops if a parent id does not
/// resolve, points into another project, or loops back on itself.
pub struct HistoryIter<'h> {
    conn: &'h Connection,
    cas: &'h FsStore,
    project_id: &'h str,
    branch_name: &'h str,
    next_id: Option<String>,
    visited: HashSet<String>,
}

impl HistoryIter<'_> {
    fn broken(&self, snapshot_id: &str, reason: &str) -> ExError {
        ExError::new(ExErrorKind::BrokenHistory)
            .with_op("get_history")
            .with_entity_id(snapshot_id)
            .with_project_id(self.project_id)
            .with_branch(self.branch_name)
            .with_message(reason.to_string())
    }

    fn step(&mut self, id: String) -> Result<Snapshot> {
        if !self.visited.insert(id.clone()) {
            return Err(self.broken(&id, "parent chain contains a cycle"));
        }
        let row = fetch_snapshot_row(self.conn, &id)?
            .ok_or_else(|| self.broken(&id, "parent snapshot does not resolve"))?;
        if row.project_id != self.project_id {
            return Err(self.broken(&id, "parent snapshot belongs to another project"));
        }
        let snapshot = hydrate(self.cas, row)?;
        self.next_id = snapshot.parent_id.clone();
        Ok(snapshot)
    }
}

impl Iterator for HistoryIter<'_> {
    type Item = Result<Snapshot>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next_id.take()?;
        // On error next_id stays None, which ends the walk.
        Some(self.step(id))
    }
}

/// Open the history of a branch
///
/// # Errors
///
/// Returns `NotFound` if the branch does not exist.
pub fn get_history<'a>(
    conn: &'a Connection,
    cas: &'a FsStore,
    branch_id: &str,
) -> Result<History<'a>> {
    let branch = SqliteRepo::get_branch(conn, branch_id)?
        .ok_or_else(|| not_found("get_history", "branch", branch_id))?;
    Ok(History {
        conn,
        cas,
        project_id: branch.project_id,
        branch_name: branch.name,
        head: branch.head_snapshot_id,
    })
}
