// Checkpoint / restore / fork scenarios against a real SQLite file and CAS
// directory, including the history properties branches must keep.

use rusqlite::Connection;
use tempfile::TempDir;
use vibestack_core::errors::ExErrorKind;
use vibestack_core::logging_facility::test_capture::init_test_capture;
use vibestack_core::{FileSet, ManifestBuilder, Snapshot};
use vibestack_engine::commands::branch::{
    checkpoint, fork, list_branches, list_snapshots, require_snapshot, restore,
    CheckpointOptions,
};
use vibestack_store::cas::FsStore;
use vibestack_store::db::open_store;
use vibestack_store::repo::SqliteRepo;

fn setup() -> (TempDir, Connection, FsStore, String) {
    let dir = TempDir::new().unwrap();
    let conn = open_store(dir.path().join("store.db")).unwrap();
    let cas = FsStore::new(dir.path().join("cas"));
    let project = SqliteRepo::create_project(&conn, "P").unwrap();
    (dir, conn, cas, project.id)
}

fn commit(
    conn: &mut Connection,
    cas: &FsStore,
    project_id: &str,
    branch: &str,
    files: &mut FileSet,
    message: &str,
) -> Snapshot {
    checkpoint(
        conn,
        cas,
        project_id,
        branch,
        files,
        message,
        CheckpointOptions::default(),
    )
    .unwrap()
}

fn ids(history: &[Snapshot]) -> Vec<&str> {
    history.iter().map(|s| s.id.as_str()).collect()
}

fn index_text(snapshot: &Snapshot) -> &str {
    std::str::from_utf8(&snapshot.manifest.get("/index.html").unwrap().content).unwrap()
}

#[test]
fn test_restore_appends_a_new_snapshot_with_old_content() {
    let (_dir, mut conn, cas, p) = setup();

    // GIVEN S1 and S2 on main
    let mut files = FileSet::new();
    files.upsert_detected("/index.html", "<h1>A</h1>").unwrap();
    let s1 = commit(&mut conn, &cas, &p, "main", &mut files, "v1");
    files.upsert_detected("/index.html", "<h1>B</h1>").unwrap();
    let s2 = commit(&mut conn, &cas, &p, "main", &mut files, "v2");
    assert_eq!(s2.parent_id.as_deref(), Some(s1.id.as_str()));

    // WHEN restoring S1 on main
    let s3 = restore(&mut conn, &cas, &p, "main", &s1.id).unwrap();

    // THEN S3 has S1's files, S2 as parent, and is the head
    assert_eq!(index_text(&s3), "<h1>A</h1>");
    assert_eq!(s3.manifest, s1.manifest);
    assert_eq!(s3.parent_id.as_deref(), Some(s2.id.as_str()));
    let branch = SqliteRepo::get_branch_by_name(&conn, &p, "main")
        .unwrap()
        .unwrap();
    assert_eq!(branch.head_snapshot_id.as_deref(), Some(s3.id.as_str()));

    let history = list_snapshots(&conn, &cas, &p, "main").unwrap();
    assert_eq!(ids(&history), vec![&s3.id[..], &s2.id[..], &s1.id[..]]);
}

#[test]
fn test_restore_never_shrinks_history_or_changes_existing_snapshots() {
    let (_dir, mut conn, cas, p) = setup();
    let mut files = FileSet::new();
    files.upsert_detected("/index.html", "<h1>A</h1>").unwrap();
    let s1 = commit(&mut conn, &cas, &p, "main", &mut files, "v1");
    files.upsert_detected("/app.js", "go()").unwrap();
    commit(&mut conn, &cas, &p, "main", &mut files, "v2");

    let before = list_snapshots(&conn, &cas, &p, "main").unwrap();
    restore(&mut conn, &cas, &p, "main", &s1.id).unwrap();
    let after = list_snapshots(&conn, &cas, &p, "main").unwrap();

    assert_eq!(after.len(), before.len() + 1);
    // Everything that was there is still there, byte for byte, in order.
    assert_eq!(&after[1..], &before[..]);
}

#[test]
fn test_history_is_newest_first_and_ends_at_a_root() {
    let (_dir, mut conn, cas, p) = setup();
    let mut files = FileSet::new();
    let mut created = Vec::new();
    for i in 0..5 {
        files
            .upsert_detected("/index.html", format!("<p>{}</p>", i))
            .unwrap();
        created.push(commit(&mut conn, &cas, &p, "main", &mut files, &format!("v{}", i)));
    }

    let history = list_snapshots(&conn, &cas, &p, "main").unwrap();

    let expected: Vec<&str> = created.iter().rev().map(|s| s.id.as_str()).collect();
    assert_eq!(ids(&history), expected);
    for pair in history.windows(2) {
        assert_eq!(pair[0].parent_id.as_deref(), Some(pair[1].id.as_str()));
    }
    assert!(history.last().unwrap().parent_id.is_none());
}

#[test]
fn test_fork_points_at_snapshot_and_isolates_branches() {
    let (_dir, mut conn, cas, p) = setup();
    let mut files = FileSet::new();
    files.upsert_detected("/index.html", "<h1>A</h1>").unwrap();
    let s1 = commit(&mut conn, &cas, &p, "main", &mut files, "v1");
    files.upsert_detected("/index.html", "<h1>B</h1>").unwrap();
    let s2 = commit(&mut conn, &cas, &p, "main", &mut files, "v2");

    // WHEN forking S1 as "experiment"
    let snapshots_before: i64 = conn
        .query_row("SELECT COUNT(*) FROM snapshots", [], |r| r.get(0))
        .unwrap();
    let experiment = fork(&mut conn, &p, &s1.id, "experiment").unwrap();

    // THEN the fork is a pure pointer to S1
    assert_eq!(experiment.head_snapshot_id.as_deref(), Some(s1.id.as_str()));
    let snapshots_after: i64 = conn
        .query_row("SELECT COUNT(*) FROM snapshots", [], |r| r.get(0))
        .unwrap();
    assert_eq!(snapshots_before, snapshots_after);
    let history = list_snapshots(&conn, &cas, &p, "experiment").unwrap();
    assert_eq!(ids(&history), vec![s1.id.as_str()]);

    // AND checkpointing on the fork leaves main alone
    let mut fork_files = ManifestBuilder::materialize(&s1.manifest);
    fork_files.upsert_detected("/index.html", "<h1>X</h1>").unwrap();
    let x1 = commit(&mut conn, &cas, &p, "experiment", &mut fork_files, "try");
    assert_eq!(x1.parent_id.as_deref(), Some(s1.id.as_str()));

    let main = SqliteRepo::get_branch_by_name(&conn, &p, "main")
        .unwrap()
        .unwrap();
    assert_eq!(main.head_snapshot_id.as_deref(), Some(s2.id.as_str()));

    let names: Vec<String> = list_branches(&conn, &p)
        .unwrap()
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(names, vec!["main".to_string(), "experiment".to_string()]);
}

#[test]
fn test_checkpoint_description_is_kept_and_restore_carries_none() {
    let (_dir, mut conn, cas, p) = setup();
    let mut files = FileSet::new();
    files.upsert_detected("/index.html", "<h1>A</h1>").unwrap();

    // GIVEN a checkpoint with a description
    let s1 = checkpoint(
        &mut conn,
        &cas,
        &p,
        "main",
        &mut files,
        "v1",
        CheckpointOptions {
            description: Some("hero section and nav".into()),
            ..Default::default()
        },
    )
    .unwrap();

    // THEN it is stored alongside the message
    let loaded = require_snapshot(&conn, &cas, &p, &s1.id).unwrap();
    assert_eq!(loaded.message, "v1");
    assert_eq!(loaded.description.as_deref(), Some("hero section and nav"));

    // AND a restore of it gets its own message and no description
    let s2 = restore(&mut conn, &cas, &p, "main", &s1.id).unwrap();
    assert_eq!(s2.message, format!("Restore of snapshot {}", s1.id));
    assert_eq!(s2.description, None);
}

#[test]
fn test_fork_onto_existing_name_is_conflict() {
    let (_dir, mut conn, cas, p) = setup();
    let mut files = FileSet::new();
    files.upsert_detected("/a.txt", "a").unwrap();
    let s1 = commit(&mut conn, &cas, &p, "main", &mut files, "v1");

    let err = fork(&mut conn, &p, &s1.id, "main").unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::Conflict);
    assert_eq!(err.branch(), Some("main"));
}

#[test]
fn test_taken_branch_name_wins_over_unknown_snapshot() {
    // GIVEN a project whose "main" branch exists
    let (_dir, mut conn, cas, p) = setup();
    let mut files = FileSet::new();
    files.upsert_detected("/a.txt", "a").unwrap();
    commit(&mut conn, &cas, &p, "main", &mut files, "v1");

    // WHEN forking an unknown snapshot onto "main"
    let err = fork(&mut conn, &p, "no-such-snapshot", "main").unwrap_err();

    // THEN the name clash is reported, not the missing snapshot
    assert_eq!(err.kind(), ExErrorKind::Conflict);
    assert_eq!(err.branch(), Some("main"));

    // AND an unknown snapshot on a free name is still NotFound
    let err = fork(&mut conn, &p, "no-such-snapshot", "fresh").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
}

#[test]
fn test_cross_project_references_are_not_found() {
    let (_dir, mut conn, cas, p) = setup();
    let other = SqliteRepo::create_project(&conn, "Q").unwrap();
    let mut files = FileSet::new();
    files.upsert_detected("/a.txt", "a").unwrap();
    let s1 = commit(&mut conn, &cas, &p, "main", &mut files, "v1");

    let err = restore(&mut conn, &cas, &other.id, "main", &s1.id).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);

    let err = fork(&mut conn, &other.id, &s1.id, "stolen").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);

    let err = require_snapshot(&conn, &cas, &other.id, &s1.id).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);

    let err = restore(&mut conn, &cas, &p, "main", "no-such-snapshot").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
}

#[test]
fn test_expected_head_guards_the_checkpoint() {
    let (_dir, mut conn, cas, p) = setup();
    let mut files = FileSet::new();
    files.upsert_detected("/a.txt", "a").unwrap();
    let s1 = commit(&mut conn, &cas, &p, "main", &mut files, "v1");
    files.upsert_detected("/a.txt", "b").unwrap();
    let s2 = commit(&mut conn, &cas, &p, "main", &mut files, "v2");

    // GIVEN a caller that last saw S1 as head
    files.upsert_detected("/a.txt", "c").unwrap();
    let err = checkpoint(
        &mut conn,
        &cas,
        &p,
        "main",
        &mut files,
        "stale",
        CheckpointOptions {
            expected_head: Some(s1.id.clone()),
            ..Default::default()
        },
    )
    .unwrap_err();

    // THEN nothing moved and the working copy is still dirty
    assert_eq!(err.kind(), ExErrorKind::HeadMismatch);
    assert!(err.kind().is_retryable());
    assert!(files.is_dirty());
    let main = SqliteRepo::get_branch_by_name(&conn, &p, "main")
        .unwrap()
        .unwrap();
    assert_eq!(main.head_snapshot_id.as_deref(), Some(s2.id.as_str()));

    // AND a fresh expectation succeeds
    let s3 = checkpoint(
        &mut conn,
        &cas,
        &p,
        "main",
        &mut files,
        "fresh",
        CheckpointOptions {
            expected_head: Some(s2.id.clone()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(s3.parent_id.as_deref(), Some(s2.id.as_str()));
}

#[test]
fn test_list_snapshots_of_unknown_branch_is_not_found() {
    let (_dir, conn, cas, p) = setup();
    let err = list_snapshots(&conn, &cas, &p, "ghost").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
    assert_eq!(err.branch(), Some("ghost"));
}

#[test]
fn test_branch_operations_are_bracketed_in_logs() {
    let capture = init_test_capture();
    let (_dir, mut conn, cas, p) = setup();
    let mut files = FileSet::new();
    files.upsert_detected("/a.txt", "a").unwrap();

    let s1 = commit(&mut conn, &cas, &p, "main", &mut files, "v1");
    restore(&mut conn, &cas, &p, "main", &s1.id).unwrap();
    fork(&mut conn, &p, &s1.id, "side").unwrap();
    let _ = fork(&mut conn, &p, &s1.id, "side");

    for op in ["checkpoint", "restore", "fork"] {
        capture.assert_op_bracketed(op);
    }

    let fork_errors = capture.count_events(|e| {
        e.op.as_deref() == Some("fork")
            && e.event.as_deref() == Some("end_error")
            && e.field("err_code") == Some("ERR_CONFLICT")
    });
    assert!(fork_errors >= 1);
}
