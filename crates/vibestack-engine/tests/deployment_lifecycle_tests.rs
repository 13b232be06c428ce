// Deployment lifecycle: publish success and failure, retry, timeout, cancel,
// and the engine command dispatcher.

use std::cell::Cell;

use rusqlite::Connection;
use tempfile::TempDir;
use vibestack_core::errors::ExErrorKind;
use vibestack_core::logging_facility::test_capture::init_test_capture;
use vibestack_core::{Artifact, DeploymentStatus, FileSet, Snapshot};
use vibestack_engine::commands::branch::{checkpoint, CheckpointOptions};
use vibestack_engine::commands::deploy::{
    cancel_deployment, deploy, list_deployments, refresh_deployment, retry_deployment,
    target_name, DirectoryPublisher, PublishError, PublishReceipt, PublishTarget, Publisher,
};
use vibestack_engine::config::DeployConfig;
use vibestack_engine::{
    apply_engine_command, EngineCommand, EngineCommandResult, EngineContext, RequestContext,
    RequestId,
};
use vibestack_store::cas::FsStore;
use vibestack_store::db::open_store;
use vibestack_store::repo::SqliteRepo;

/// Fails the first `failures` publishes, then succeeds
struct FlakyPublisher {
    failures: Cell<u32>,
    calls: Cell<u32>,
}

impl FlakyPublisher {
    fn failing(failures: u32) -> Self {
        Self {
            failures: Cell::new(failures),
            calls: Cell::new(0),
        }
    }
}

impl Publisher for FlakyPublisher {
    fn publish(
        &self,
        target: &PublishTarget,
        artifact: &Artifact,
    ) -> Result<PublishReceipt, PublishError> {
        self.calls.set(self.calls.get() + 1);
        if self.failures.get() > 0 {
            self.failures.set(self.failures.get() - 1);
            return Err(PublishError::new("platform returned 502"));
        }
        assert!(artifact.route("/index.html").is_some());
        Ok(PublishReceipt {
            url: format!("https://{}.test.workers.dev", target.name),
        })
    }
}

struct Fixture {
    dir: TempDir,
    conn: Connection,
    cas: FsStore,
    project_id: String,
    snapshot: Snapshot,
    config: DeployConfig,
}

fn setup() -> Fixture {
    let dir = TempDir::new().unwrap();
    let mut conn = open_store(dir.path().join("store.db")).unwrap();
    let cas = FsStore::new(dir.path().join("cas"));
    let project = SqliteRepo::create_project(&conn, "site").unwrap();

    let mut files = FileSet::new();
    files.upsert_detected("/index.html", "<h1>Hi</h1>").unwrap();
    files.upsert_detected("/style.css", "body{color:red}").unwrap();
    let snapshot = checkpoint(
        &mut conn,
        &cas,
        &project.id,
        "main",
        &mut files,
        "v1",
        CheckpointOptions::default(),
    )
    .unwrap();

    let config = DeployConfig {
        output_dir: dir.path().join("deployments"),
        ..DeployConfig::default()
    };

    Fixture {
        dir,
        conn,
        cas,
        project_id: project.id,
        snapshot,
        config,
    }
}

fn age_deployment(conn: &Connection, deployment_id: &str, by_ms: i64) {
    conn.execute(
        "UPDATE deployments SET created_at = created_at - ?1 WHERE id = ?2",
        rusqlite::params![by_ms, deployment_id],
    )
    .unwrap();
}

#[test]
fn test_successful_deploy_stores_artifact_and_publishes() {
    let fx = setup();
    let publisher = DirectoryPublisher::from_config(&fx.config);

    let deployment = deploy(
        &fx.conn,
        &fx.cas,
        &publisher,
        &fx.config,
        &fx.project_id,
        &fx.snapshot.id,
    )
    .unwrap();

    assert_eq!(deployment.status, DeploymentStatus::Success);
    let target = target_name("uv", &fx.project_id);
    assert_eq!(deployment.target_name, target);
    assert_eq!(
        deployment.url.as_deref(),
        Some(format!("https://{}.vibestack.workers.dev", target).as_str())
    );

    // The stored artifact is the script that was published
    let artifact_ref = deployment.artifact_ref.clone().unwrap();
    let stored = fx.cas.read(&artifact_ref).unwrap();
    let published = std::fs::read(publisher.script_path(&target)).unwrap();
    assert_eq!(stored, published);
    assert!(fx.dir.path().join("deployments").join(&target).is_dir());

    assert!(deployment.into_result().is_ok());
}

#[test]
fn test_publish_failure_is_recorded_and_snapshot_stays_reusable() {
    let fx = setup();
    let publisher = FlakyPublisher::failing(1);

    let failed = deploy(
        &fx.conn,
        &fx.cas,
        &publisher,
        &fx.config,
        &fx.project_id,
        &fx.snapshot.id,
    )
    .unwrap();

    assert_eq!(failed.status, DeploymentStatus::Failed);
    assert_eq!(failed.error_message.as_deref(), Some("platform returned 502"));
    assert!(failed.url.is_none());
    let err = failed.clone().into_result().unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::PublishFailure);
    assert!(err.kind().is_retryable());

    // WHEN retrying the failed deployment
    let retried = retry_deployment(&fx.conn, &fx.cas, &publisher, &fx.config, &failed.id).unwrap();

    // THEN a new deployment of the same snapshot succeeds
    assert_ne!(retried.id, failed.id);
    assert_eq!(retried.snapshot_id, fx.snapshot.id);
    assert_eq!(retried.status, DeploymentStatus::Success);
    assert_eq!(retried.artifact_ref, failed.artifact_ref);
    assert_eq!(publisher.calls.get(), 2);

    // AND the failed record itself never changes again
    let original = SqliteRepo::get_deployment(&fx.conn, &failed.id)
        .unwrap()
        .unwrap();
    assert_eq!(original.status, DeploymentStatus::Failed);
}

#[test]
fn test_retry_of_success_is_idempotent() {
    let fx = setup();
    let publisher = FlakyPublisher::failing(0);
    let done = deploy(
        &fx.conn,
        &fx.cas,
        &publisher,
        &fx.config,
        &fx.project_id,
        &fx.snapshot.id,
    )
    .unwrap();

    let again = retry_deployment(&fx.conn, &fx.cas, &publisher, &fx.config, &done.id).unwrap();

    assert_eq!(again, done);
    assert_eq!(publisher.calls.get(), 1);
    assert_eq!(list_deployments(&fx.conn, &fx.project_id).unwrap().len(), 1);
}

#[test]
fn test_stale_pending_times_out_and_can_be_retried() {
    let fx = setup();
    let target = target_name("uv", &fx.project_id);
    let pending =
        SqliteRepo::insert_pending_deployment(&fx.conn, &fx.project_id, &fx.snapshot.id, &target)
            .unwrap();
    let publisher = FlakyPublisher::failing(0);

    // GIVEN a pending deployment well within its timeout
    let fresh = refresh_deployment(&fx.conn, &fx.config, &pending.id).unwrap();
    assert_eq!(fresh.status, DeploymentStatus::Pending);
    let err =
        retry_deployment(&fx.conn, &fx.cas, &publisher, &fx.config, &pending.id).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Conflict);

    // WHEN it ages past the timeout
    age_deployment(&fx.conn, &pending.id, fx.config.pending_timeout_ms() + 1_000);
    let timed_out = refresh_deployment(&fx.conn, &fx.config, &pending.id).unwrap();

    // THEN it is finalised as failed
    assert_eq!(timed_out.status, DeploymentStatus::Failed);
    assert!(timed_out.error_message.unwrap().starts_with("timed out"));

    let retried =
        retry_deployment(&fx.conn, &fx.cas, &publisher, &fx.config, &pending.id).unwrap();
    assert_eq!(retried.status, DeploymentStatus::Success);
}

#[test]
fn test_cancel_only_applies_to_pending() {
    let fx = setup();
    let target = target_name("uv", &fx.project_id);
    let pending =
        SqliteRepo::insert_pending_deployment(&fx.conn, &fx.project_id, &fx.snapshot.id, &target)
            .unwrap();

    let cancelled = cancel_deployment(&fx.conn, &pending.id).unwrap();
    assert_eq!(cancelled.status, DeploymentStatus::Failed);
    assert_eq!(cancelled.error_message.as_deref(), Some("cancelled"));

    let err = cancel_deployment(&fx.conn, &pending.id).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidTransition);

    let err = cancel_deployment(&fx.conn, "missing").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
}

#[test]
fn test_deploy_rejects_foreign_or_unknown_snapshot() {
    let fx = setup();
    let other = SqliteRepo::create_project(&fx.conn, "other").unwrap();
    let publisher = FlakyPublisher::failing(0);

    let err = deploy(
        &fx.conn,
        &fx.cas,
        &publisher,
        &fx.config,
        &other.id,
        &fx.snapshot.id,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);

    let err = deploy(
        &fx.conn,
        &fx.cas,
        &publisher,
        &fx.config,
        "no-project",
        &fx.snapshot.id,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
    assert_eq!(publisher.calls.get(), 0);
}

#[test]
fn test_list_deployments_newest_first() {
    let fx = setup();
    let publisher = FlakyPublisher::failing(1);
    let first = deploy(
        &fx.conn,
        &fx.cas,
        &publisher,
        &fx.config,
        &fx.project_id,
        &fx.snapshot.id,
    )
    .unwrap();
    let second = deploy(
        &fx.conn,
        &fx.cas,
        &publisher,
        &fx.config,
        &fx.project_id,
        &fx.snapshot.id,
    )
    .unwrap();

    let listed: Vec<String> = list_deployments(&fx.conn, &fx.project_id)
        .unwrap()
        .into_iter()
        .map(|d| d.id)
        .collect();
    assert_eq!(listed, vec![second.id, first.id]);
}

#[test]
fn test_engine_commands_dispatch_to_operations() {
    let mut fx = setup();
    let publisher = FlakyPublisher::failing(0);
    let request = RequestContext::new();
    let ctx = EngineContext {
        cas: &fx.cas,
        publisher: &publisher,
        deploy: &fx.config,
        request: &request,
    };

    let forked = apply_engine_command(
        EngineCommand::Fork {
            project_id: fx.project_id.clone(),
            from_snapshot_id: fx.snapshot.id.clone(),
            new_branch: "preview".into(),
        },
        &mut fx.conn,
        &ctx,
    )
    .unwrap();
    assert!(matches!(forked, EngineCommandResult::Fork(ref b) if b.name == "preview"));

    let mut files = FileSet::new();
    files.upsert_detected("/index.html", "<h1>Preview</h1>").unwrap();
    let result = apply_engine_command(
        EngineCommand::Checkpoint {
            project_id: fx.project_id.clone(),
            branch: "preview".into(),
            files,
            message: "preview change".into(),
            options: CheckpointOptions::default(),
        },
        &mut fx.conn,
        &ctx,
    )
    .unwrap();
    let snapshot = match result {
        EngineCommandResult::Checkpoint { snapshot, files } => {
            assert!(!files.is_dirty());
            snapshot
        }
        other => panic!("unexpected result: {:?}", other),
    };
    assert_eq!(snapshot.parent_id.as_deref(), Some(fx.snapshot.id.as_str()));

    let deployed = apply_engine_command(
        EngineCommand::Deploy {
            project_id: fx.project_id.clone(),
            snapshot_id: snapshot.id.clone(),
        },
        &mut fx.conn,
        &ctx,
    )
    .unwrap();
    match deployed {
        EngineCommandResult::Deployment(d) => assert_eq!(d.status, DeploymentStatus::Success),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_deployment_operations_are_bracketed_in_logs() {
    let capture = init_test_capture();
    let fx = setup();
    let publisher = FlakyPublisher::failing(1);

    let failed = deploy(
        &fx.conn,
        &fx.cas,
        &publisher,
        &fx.config,
        &fx.project_id,
        &fx.snapshot.id,
    )
    .unwrap();
    retry_deployment(&fx.conn, &fx.cas, &publisher, &fx.config, &failed.id).unwrap();
    refresh_deployment(&fx.conn, &fx.config, &failed.id).unwrap();
    let _ = cancel_deployment(&fx.conn, &failed.id);

    for op in [
        "deploy",
        "retry_deployment",
        "refresh_deployment",
        "cancel_deployment",
    ] {
        capture.assert_op_bracketed(op);
    }
}

#[test]
fn test_engine_commands_carry_request_id_in_logs_and_errors() {
    // GIVEN a capture layer and a caller-supplied request id
    let capture = init_test_capture();
    let mut fx = setup();
    let publisher = FlakyPublisher::failing(0);
    let request = RequestContext::with_request_id(RequestId::from_string(
        "req-dispatch-correlation".to_string(),
    ));
    let ctx = EngineContext {
        cas: &fx.cas,
        publisher: &publisher,
        deploy: &fx.config,
        request: &request,
    };

    // WHEN one command succeeds and one fails
    apply_engine_command(
        EngineCommand::Deploy {
            project_id: fx.project_id.clone(),
            snapshot_id: fx.snapshot.id.clone(),
        },
        &mut fx.conn,
        &ctx,
    )
    .unwrap();
    let err = apply_engine_command(
        EngineCommand::Fork {
            project_id: fx.project_id.clone(),
            from_snapshot_id: fx.snapshot.id.clone(),
            new_branch: "main".into(),
        },
        &mut fx.conn,
        &ctx,
    )
    .unwrap_err();

    // THEN the error is stamped with the request id
    assert_eq!(err.kind(), ExErrorKind::Conflict);
    assert_eq!(err.request_id(), Some(&request.request_id));

    // AND both dispatches are bracketed by events carrying it
    let tagged = |command: &str, event: &str| {
        capture.count_events(|e| {
            e.op.as_deref() == Some("apply_engine_command")
                && e.field("request_id") == Some("req-dispatch-correlation")
                && e.field("command") == Some(command)
                && e.event.as_deref() == Some(event)
        })
    };
    assert_eq!(tagged("deploy", "start"), 1);
    assert_eq!(tagged("deploy", "end"), 1);
    assert_eq!(tagged("fork", "start"), 1);
    assert_eq!(tagged("fork", "end_error"), 1);
}
