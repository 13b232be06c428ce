//! Branch operations: checkpoint, restore, fork and listing.
//!
//! Every head move runs inside an `IMMEDIATE` transaction and is applied as
//! a compare-and-swap on the head read at the start of the operation, so two
//! writers on the same branch cannot interleave their read-modify-write.

use rusqlite::{Connection, TransactionBehavior};
use vibestack_core::errors::{ExError, ExErrorKind};
use vibestack_core::{log_op_end, log_op_error, log_op_start};
use vibestack_core::{Branch, FileSet, Manifest, ManifestBuilder, Snapshot};
use vibestack_store::cas::FsStore;
use vibestack_store::errors::{not_found, sqlite_error, Result};
use vibestack_store::repo::SqliteRepo;
use vibestack_store::snapshot::{create_snapshot, get_history, get_snapshot};

/// Options for [`checkpoint`]
#[derive(Debug, Clone, Default)]
pub struct CheckpointOptions {
    /// Fail with `HeadMismatch` unless the branch head is this snapshot
    pub expected_head: Option<String>,
    /// Longer note stored with the snapshot
    pub description: Option<String>,
}

/// Capture `files` as a new snapshot at the head of `branch_name`
///
/// The branch is created with no head if it does not exist yet. On success
/// the branch head points at the returned snapshot and `files` is marked
/// clean.
///
/// # Errors
///
/// - `NotFound`: the project does not exist
/// - `InvalidInput`: the branch name is malformed
/// - `HeadMismatch`: `options.expected_head` is stale, or another writer
///   moved the head first
/// - `Persistence` / `Io`: store failure
pub fn checkpoint(
    conn: &mut Connection,
    cas: &FsStore,
    project_id: &str,
    branch_name: &str,
    files: &mut FileSet,
    message: &str,
    options: CheckpointOptions,
) -> Result<Snapshot> {
    log_op_start!("checkpoint", project_id = project_id, branch = branch_name);
    let start = std::time::Instant::now();

    let manifest = ManifestBuilder::build(files);
    let result = with_immediate_tx(conn, "checkpoint", |tx| {
        append_to_branch(
            tx,
            cas,
            project_id,
            branch_name,
            &manifest,
            message,
            options.description.as_deref(),
            options.expected_head.as_deref(),
            "checkpoint",
        )
    })
    .map_err(|e| {
        log_op_error!(
            "checkpoint",
            &e,
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    files.mark_clean();

    log_op_end!(
        "checkpoint",
        duration_ms = start.elapsed().as_millis() as u64,
        snapshot_id = result.id.as_str(),
        file_count = result.manifest.len()
    );
    Ok(result)
}

/// Bring `branch_name` back to the state of `snapshot_id`
///
/// Restoring never rewinds: the target's files are materialised and
/// checkpointed as a new snapshot whose parent is the current head. The
/// returned snapshot is that new one.
///
/// # Errors
///
/// - `NotFound`: the project does not exist, or `snapshot_id` is not one of
///   its snapshots
/// - `HeadMismatch`: another writer moved the head first
/// - `MissingBlob`: the target's manifest blob is gone
pub fn restore(
    conn: &mut Connection,
    cas: &FsStore,
    project_id: &str,
    branch_name: &str,
    snapshot_id: &str,
) -> Result<Snapshot> {
    log_op_start!(
        "restore",
        project_id = project_id,
        branch = branch_name,
        from_snapshot_id = snapshot_id
    );
    let start = std::time::Instant::now();

    let result = with_immediate_tx(conn, "restore", |tx| {
        SqliteRepo::require_project(tx, project_id, "restore")?;
        let target = get_snapshot(tx, cas, snapshot_id)?
            .filter(|s| s.project_id == project_id)
            .ok_or_else(|| {
                not_found("restore", "snapshot", snapshot_id).with_project_id(project_id)
            })?;

        let rebuilt = ManifestBuilder::materialize(&target.manifest);
        let manifest = ManifestBuilder::build(&rebuilt);
        let message = format!("Restore of snapshot {}", target.id);
        append_to_branch(
            tx,
            cas,
            project_id,
            branch_name,
            &manifest,
            &message,
            None,
            None,
            "restore",
        )
    })
    .map_err(|e| {
        log_op_error!(
            "restore",
            &e,
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "restore",
        duration_ms = start.elapsed().as_millis() as u64,
        snapshot_id = result.id.as_str()
    );
    Ok(result)
}

/// Create `new_branch` pointing directly at `from_snapshot_id`
///
/// No snapshot is created.
///
/// # Errors
///
/// - `NotFound`: the project does not exist, or the snapshot is not one of
///   its snapshots
/// - `Conflict`: the project already has a branch called `new_branch`
/// - `InvalidInput`: the branch name is malformed
pub fn fork(
    conn: &mut Connection,
    project_id: &str,
    from_snapshot_id: &str,
    new_branch: &str,
) -> Result<Branch> {
    log_op_start!(
        "fork",
        project_id = project_id,
        from_snapshot_id = from_snapshot_id,
        branch = new_branch
    );
    let start = std::time::Instant::now();

    let result = with_immediate_tx(conn, "fork", |tx| {
        SqliteRepo::require_project(tx, project_id, "fork")?;
        SqliteRepo::insert_branch(tx, project_id, new_branch, Some(from_snapshot_id))
            .map_err(|e| e.with_op("fork"))
    })
    .map_err(|e| {
        log_op_error!(
            "fork",
            &e,
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "fork",
        duration_ms = start.elapsed().as_millis() as u64,
        branch_id = result.id.as_str()
    );
    Ok(result)
}

/// Branches of a project in creation order
///
/// # Errors
///
/// Returns `NotFound` if the project does not exist.
pub fn list_branches(conn: &Connection, project_id: &str) -> Result<Vec<Branch>> {
    SqliteRepo::require_project(conn, project_id, "list_branches")?;
    SqliteRepo::list_branches(conn, project_id)
}

/// History of `branch_name`, newest first
///
/// # Errors
///
/// - `NotFound`: the project or branch does not exist
/// - `BrokenHistory`: the parent chain is corrupt
pub fn list_snapshots(
    conn: &Connection,
    cas: &FsStore,
    project_id: &str,
    branch_name: &str,
) -> Result<Vec<Snapshot>> {
    SqliteRepo::require_project(conn, project_id, "list_snapshots")?;
    let branch = SqliteRepo::get_branch_by_name(conn, project_id, branch_name)?
        .ok_or_else(|| {
            not_found("list_snapshots", "branch", branch_name)
                .with_project_id(project_id)
                .with_branch(branch_name)
        })?;
    get_history(conn, cas, &branch.id)?.to_vec()
}

/// Snapshot `snapshot_id` if it belongs to `project_id`
///
/// # Errors
///
/// Returns `NotFound` if the snapshot is absent or owned by another project.
pub fn require_snapshot(
    conn: &Connection,
    cas: &FsStore,
    project_id: &str,
    snapshot_id: &str,
) -> Result<Snapshot> {
    get_snapshot(conn, cas, snapshot_id)?
        .filter(|s| s.project_id == project_id)
        .ok_or_else(|| {
            not_found("get_snapshot", "snapshot", snapshot_id).with_project_id(project_id)
        })
}

#[allow(clippy::too_many_arguments)]
fn append_to_branch(
    tx: &Connection,
    cas: &FsStore,
    project_id: &str,
    branch_name: &str,
    manifest: &Manifest,
    message: &str,
    description: Option<&str>,
    expected_head: Option<&str>,
    op: &str,
) -> Result<Snapshot> {
    SqliteRepo::require_project(tx, project_id, op)?;
    let branch = SqliteRepo::get_or_create_branch(tx, project_id, branch_name)?;

    if let Some(expected) = expected_head {
        if branch.head_snapshot_id.as_deref() != Some(expected) {
            return Err(ExError::new(ExErrorKind::HeadMismatch)
                .with_op(op)
                .with_project_id(project_id)
                .with_branch(branch_name)
                .with_message(format!(
                    "expected head {}, found {}",
                    expected,
                    branch.head_snapshot_id.as_deref().unwrap_or("<none>")
                )));
        }
    }

    let snapshot = create_snapshot(
        tx,
        cas,
        project_id,
        &branch.id,
        message,
        description,
        manifest,
    )?;
    SqliteRepo::compare_and_set_head(
        tx,
        &branch.id,
        branch.head_snapshot_id.as_deref(),
        &snapshot.id,
    )
    .map_err(|e| e.with_op(op).with_project_id(project_id).with_branch(branch_name))?;

    Ok(snapshot)
}

/// Run `f` in an `IMMEDIATE` transaction, committing only on success
fn with_immediate_tx<T>(
    conn: &mut Connection,
    op: &str,
    f: impl FnOnce(&Connection) -> Result<T>,
) -> Result<T> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| sqlite_error(op, e))?;
    let value = f(&tx)?;
    tx.commit().map_err(|e| sqlite_error(op, e))?;
    Ok(value)
}
