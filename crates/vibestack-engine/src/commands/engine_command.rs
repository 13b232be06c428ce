//! Engine-level mutation commands.

use rusqlite::Connection;
use vibestack_core::{log_op_end, log_op_error, log_op_start};
use vibestack_core::{Branch, Deployment, FileSet, Snapshot};
use vibestack_core_types::RequestContext;
use vibestack_store::cas::FsStore;
use vibestack_store::errors::Result;

use crate::commands::branch::CheckpointOptions;
use crate::commands::deploy::Publisher;
use crate::config::DeployConfig;

/// Mutations a front end can request
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Capture a working copy on a branch
    Checkpoint {
        project_id: String,
        branch: String,
        files: FileSet,
        message: String,
        options: CheckpointOptions,
    },
    /// Re-checkpoint an earlier snapshot's files on a branch
    Restore {
        project_id: String,
        branch: String,
        snapshot_id: String,
    },
    /// Start a new branch at an existing snapshot
    Fork {
        project_id: String,
        from_snapshot_id: String,
        new_branch: String,
    },
    Deploy {
        project_id: String,
        snapshot_id: String,
    },
    RetryDeployment { deployment_id: String },
    CancelDeployment { deployment_id: String },
    RefreshDeployment { deployment_id: String },
}

impl EngineCommand {
    /// Stable name used as the `command` log field
    pub fn name(&self) -> &'static str {
        match self {
            EngineCommand::Checkpoint { .. } => "checkpoint",
            EngineCommand::Restore { .. } => "restore",
            EngineCommand::Fork { .. } => "fork",
            EngineCommand::Deploy { .. } => "deploy",
            EngineCommand::RetryDeployment { .. } => "retry_deployment",
            EngineCommand::CancelDeployment { .. } => "cancel_deployment",
            EngineCommand::RefreshDeployment { .. } => "refresh_deployment",
        }
    }
}

/// Result of applying an engine command
#[derive(Debug, Clone)]
pub enum EngineCommandResult {
    /// The new snapshot, plus the working copy as it now stands (clean)
    Checkpoint { snapshot: Snapshot, files: FileSet },
    Restore(Snapshot),
    Fork(Branch),
    Deployment(Deployment),
}

/// Dependencies the engine commands need besides the database
pub struct EngineContext<'a> {
    pub cas: &'a FsStore,
    pub publisher: &'a dyn Publisher,
    pub deploy: &'a DeployConfig,
    pub request: &'a RequestContext,
}

/// Apply one engine command
///
/// The command runs inside a `request` span, and its own start/end events
/// carry `request_id` and `command`.
///
/// # Errors
///
/// Propagates the error of the underlying operation, stamped with the
/// context's request id.
pub fn apply_engine_command(
    cmd: EngineCommand,
    conn: &mut Connection,
    ctx: &EngineContext<'_>,
) -> Result<EngineCommandResult> {
    let request_id = ctx.request.request_id.as_str();
    let command = cmd.name();
    let span = tracing::info_span!("request", request_id = request_id);
    let _entered = span.enter();

    log_op_start!(
        "apply_engine_command",
        request_id = request_id,
        command = command
    );
    let start = std::time::Instant::now();

    let result = dispatch(cmd, conn, ctx).map_err(|e| {
        let e = e.with_request_id(ctx.request.request_id.clone());
        log_op_error!(
            "apply_engine_command",
            &e,
            duration_ms = start.elapsed().as_millis() as u64,
            request_id = request_id,
            command = command
        );
        e
    })?;

    log_op_end!(
        "apply_engine_command",
        duration_ms = start.elapsed().as_millis() as u64,
        request_id = request_id,
        command = command
    );
    Ok(result)
}

fn dispatch(
    cmd: EngineCommand,
    conn: &mut Connection,
    ctx: &EngineContext<'_>,
) -> Result<EngineCommandResult> {
    match cmd {
        EngineCommand::Checkpoint {
            project_id,
            branch,
            mut files,
            message,
            options,
        } => {
            let snapshot = crate::commands::branch::checkpoint(
                conn,
                ctx.cas,
                &project_id,
                &branch,
                &mut files,
                &message,
                options,
            )?;
            Ok(EngineCommandResult::Checkpoint { snapshot, files })
        }
        EngineCommand::Restore {
            project_id,
            branch,
            snapshot_id,
        } => crate::commands::branch::restore(conn, ctx.cas, &project_id, &branch, &snapshot_id)
            .map(EngineCommandResult::Restore),
        EngineCommand::Fork {
            project_id,
            from_snapshot_id,
            new_branch,
        } => crate::commands::branch::fork(conn, &project_id, &from_snapshot_id, &new_branch)
            .map(EngineCommandResult::Fork),
        EngineCommand::Deploy {
            project_id,
            snapshot_id,
        } => crate::commands::deploy::deploy(
            conn,
            ctx.cas,
            ctx.publisher,
            ctx.deploy,
            &project_id,
            &snapshot_id,
        )
        .map(EngineCommandResult::Deployment),
        EngineCommand::RetryDeployment { deployment_id } => {
            crate::commands::deploy::retry_deployment(
                conn,
                ctx.cas,
                ctx.publisher,
                ctx.deploy,
                &deployment_id,
            )
            .map(EngineCommandResult::Deployment)
        }
        EngineCommand::CancelDeployment { deployment_id } => {
            crate::commands::deploy::cancel_deployment(conn, &deployment_id)
                .map(EngineCommandResult::Deployment)
        }
        EngineCommand::RefreshDeployment { deployment_id } => {
            crate::commands::deploy::refresh_deployment(conn, ctx.deploy, &deployment_id)
                .map(EngineCommandResult::Deployment)
        }
    }
}
