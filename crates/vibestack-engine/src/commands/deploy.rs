//! Deployment lifecycle: build, store, publish and finalise.
//!
//! A deployment row is inserted as `pending` before any work starts and is
//! finalised exactly once. Publishing is the only step that talks to the
//! outside world; it goes through the [`Publisher`] seam.

use std::path::PathBuf;

use rusqlite::Connection;
use vibestack_core::errors::{ExError, ExErrorKind};
use vibestack_core::{log_op_end, log_op_error, log_op_start};
use vibestack_core::{Artifact, ArtifactBuilder, Deployment, DeploymentStatus};
use vibestack_store::cas::{BlobKind, FsStore};
use vibestack_store::db::now_ms;
use vibestack_store::errors::{not_found, Result};
use vibestack_store::repo::SqliteRepo;
use vibestack_store::snapshot::get_snapshot;

use crate::config::DeployConfig;

/// Where an artifact is published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget {
    /// Stable name derived from the project id, see [`target_name`]
    pub name: String,
    pub project_id: String,
    pub deployment_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub url: String,
}

/// Failure reported by a [`Publisher`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishError {
    pub message: String,
}

impl PublishError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for PublishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for PublishError {}

/// The external deployment collaborator
pub trait Publisher {
    /// Make `artifact` reachable under `target`
    ///
    /// # Errors
    ///
    /// Any platform or network failure; it is recorded on the deployment.
    fn publish(
        &self,
        target: &PublishTarget,
        artifact: &Artifact,
    ) -> std::result::Result<PublishReceipt, PublishError>;
}

/// Publishes worker scripts to a local directory
///
/// Writes `<output_dir>/<target>/worker.js` and reports the URL the worker
/// would be served from.
#[derive(Debug, Clone)]
pub struct DirectoryPublisher {
    output_dir: PathBuf,
    subdomain: String,
}

impl DirectoryPublisher {
    pub fn new(output_dir: impl Into<PathBuf>, subdomain: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            subdomain: subdomain.into(),
        }
    }

    pub fn from_config(config: &DeployConfig) -> Self {
        Self::new(&config.output_dir, &config.workers_subdomain)
    }

    pub fn script_path(&self, target: &str) -> PathBuf {
        self.output_dir.join(target).join("worker.js")
    }
}

impl Publisher for DirectoryPublisher {
    fn publish(
        &self,
        target: &PublishTarget,
        artifact: &Artifact,
    ) -> std::result::Result<PublishReceipt, PublishError> {
        let script = artifact
            .render_script()
            .map_err(|e| PublishError::new(e.to_string()))?;
        let path = self.script_path(&target.name);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| {
                PublishError::new(format!("cannot create {}: {}", dir.display(), e))
            })?;
        }
        std::fs::write(&path, script)
            .map_err(|e| PublishError::new(format!("cannot write {}: {}", path.display(), e)))?;

        Ok(PublishReceipt {
            url: format!("https://{}.{}.workers.dev", target.name, self.subdomain),
        })
    }
}

/// Publish target name for a project: `<prefix>-` plus the first eight
/// characters of the id with dashes removed
pub fn target_name(prefix: &str, project_id: &str) -> String {
    let short: String = project_id.chars().filter(|c| *c != '-').take(8).collect();
    format!("{}-{}", prefix, short)
}

/// Build, store and publish the artifact of `snapshot_id`
///
/// Returns the finalised deployment. A publish failure is not an error of
/// this function: the deployment comes back `Failed` with the cause in
/// `error_message` (use [`Deployment::into_result`] to turn it into one).
///
/// # Errors
///
/// - `NotFound`: the project does not exist or does not own the snapshot
/// - `Persistence`: the deployment row could not be written
pub fn deploy(
    conn: &Connection,
    cas: &FsStore,
    publisher: &dyn Publisher,
    config: &DeployConfig,
    project_id: &str,
    snapshot_id: &str,
) -> Result<Deployment> {
    log_op_start!("deploy", project_id = project_id, snapshot_id = snapshot_id);
    let start = std::time::Instant::now();

    let result = deploy_impl(conn, cas, publisher, config, project_id, snapshot_id).map_err(|e| {
        log_op_error!(
            "deploy",
            &e,
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "deploy",
        duration_ms = start.elapsed().as_millis() as u64,
        deployment_id = result.id.as_str(),
        status = result.status.as_str()
    );
    Ok(result)
}

fn deploy_impl(
    conn: &Connection,
    cas: &FsStore,
    publisher: &dyn Publisher,
    config: &DeployConfig,
    project_id: &str,
    snapshot_id: &str,
) -> Result<Deployment> {
    SqliteRepo::require_project(conn, project_id, "deploy")?;
    let target = target_name(&config.worker_prefix, project_id);
    let pending = SqliteRepo::insert_pending_deployment(conn, project_id, snapshot_id, &target)
        .map_err(|e| e.with_op("deploy"))?;

    match build_and_publish(conn, cas, publisher, &pending) {
        Ok(receipt) => finalize_or_current(
            conn,
            &pending.id,
            DeploymentStatus::Success,
            Some(&receipt.url),
            None,
        ),
        Err(message) => {
            tracing::warn!(
                deployment_id = %pending.id,
                error = %message,
                "Deployment failed"
            );
            finalize_or_current(
                conn,
                &pending.id,
                DeploymentStatus::Failed,
                None,
                Some(&message),
            )
        }
    }
}

/// Everything between the pending row and the terminal status
///
/// Failures come back as the message to record on the deployment.
fn build_and_publish(
    conn: &Connection,
    cas: &FsStore,
    publisher: &dyn Publisher,
    pending: &Deployment,
) -> std::result::Result<PublishReceipt, String> {
    let snapshot = get_snapshot(conn, cas, &pending.snapshot_id)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("snapshot {} not found", pending.snapshot_id))?;

    let artifact = ArtifactBuilder::build(&snapshot.manifest);
    let script = artifact.render_script().map_err(|e| e.to_string())?;
    let artifact_ref = cas
        .write(script.as_bytes(), BlobKind::Artifact)
        .map_err(|e| e.to_string())?;

    let still_pending = SqliteRepo::set_deployment_artifact(conn, &pending.id, &artifact_ref)
        .map_err(|e| e.to_string())?;
    if !still_pending {
        return Err("deployment was finalised before publishing".to_string());
    }

    let target = PublishTarget {
        name: pending.target_name.clone(),
        project_id: pending.project_id.clone(),
        deployment_id: pending.id.clone(),
    };
    publisher
        .publish(&target, &artifact)
        .map_err(|e| e.message)
}

/// Finalise, or return the row as it stands if someone else finalised it
fn finalize_or_current(
    conn: &Connection,
    deployment_id: &str,
    status: DeploymentStatus,
    url: Option<&str>,
    error_message: Option<&str>,
) -> Result<Deployment> {
    match SqliteRepo::finalize_deployment(conn, deployment_id, status, url, error_message) {
        Ok(deployment) => Ok(deployment),
        Err(e) if e.kind() == ExErrorKind::InvalidTransition => {
            require_deployment(conn, deployment_id, "finalize_deployment")
        }
        Err(e) => Err(e),
    }
}

fn require_deployment(conn: &Connection, deployment_id: &str, op: &str) -> Result<Deployment> {
    SqliteRepo::get_deployment(conn, deployment_id)?
        .ok_or_else(|| not_found(op, "deployment", deployment_id))
}

/// Current state of a deployment, timing out a stale `Pending` one
///
/// # Errors
///
/// Returns `NotFound` if the deployment does not exist.
pub fn refresh_deployment(
    conn: &Connection,
    config: &DeployConfig,
    deployment_id: &str,
) -> Result<Deployment> {
    log_op_start!("refresh_deployment", deployment_id = deployment_id);
    let start = std::time::Instant::now();

    let result = refresh_impl(conn, config, deployment_id).map_err(|e| {
        log_op_error!(
            "refresh_deployment",
            &e,
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "refresh_deployment",
        duration_ms = start.elapsed().as_millis() as u64,
        status = result.status.as_str()
    );
    Ok(result)
}

fn refresh_impl(conn: &Connection, config: &DeployConfig, deployment_id: &str) -> Result<Deployment> {
    let current = require_deployment(conn, deployment_id, "refresh_deployment")?;
    if !current.is_stale(now_ms(), config.pending_timeout_ms()) {
        return Ok(current);
    }
    let message = format!(
        "timed out after {}s in pending",
        config.pending_timeout_secs
    );
    finalize_or_current(
        conn,
        deployment_id,
        DeploymentStatus::Failed,
        None,
        Some(&message),
    )
}

/// Fail a `Pending` deployment with "cancelled"
///
/// # Errors
///
/// - `NotFound`: the deployment does not exist
/// - `InvalidTransition`: the deployment is already finalised
pub fn cancel_deployment(conn: &Connection, deployment_id: &str) -> Result<Deployment> {
    log_op_start!("cancel_deployment", deployment_id = deployment_id);
    let start = std::time::Instant::now();

    let result = require_deployment(conn, deployment_id, "cancel_deployment")
        .and_then(|current| {
            if current.status.is_terminal() {
                return Err(ExError::new(ExErrorKind::InvalidTransition)
                    .with_op("cancel_deployment")
                    .with_entity_id(deployment_id)
                    .with_project_id(current.project_id)
                    .with_message(format!("deployment is already {}", current.status)));
            }
            SqliteRepo::finalize_deployment(
                conn,
                deployment_id,
                DeploymentStatus::Failed,
                None,
                Some("cancelled"),
            )
        })
        .map_err(|e| {
            log_op_error!(
                "cancel_deployment",
                &e,
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

    log_op_end!(
        "cancel_deployment",
        duration_ms = start.elapsed().as_millis() as u64
    );
    Ok(result)
}

/// Re-attempt a deployment against the same snapshot
///
/// A successful deployment is returned unchanged. A failed or timed-out one
/// is followed by a fresh deployment, which is returned.
///
/// # Errors
///
/// - `NotFound`: the deployment does not exist
/// - `Conflict`: the deployment is still pending within its timeout
pub fn retry_deployment(
    conn: &Connection,
    cas: &FsStore,
    publisher: &dyn Publisher,
    config: &DeployConfig,
    deployment_id: &str,
) -> Result<Deployment> {
    log_op_start!("retry_deployment", deployment_id = deployment_id);
    let start = std::time::Instant::now();

    let result = retry_impl(conn, cas, publisher, config, deployment_id).map_err(|e| {
        log_op_error!(
            "retry_deployment",
            &e,
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "retry_deployment",
        duration_ms = start.elapsed().as_millis() as u64,
        new_deployment_id = result.id.as_str(),
        status = result.status.as_str()
    );
    Ok(result)
}

fn retry_impl(
    conn: &Connection,
    cas: &FsStore,
    publisher: &dyn Publisher,
    config: &DeployConfig,
    deployment_id: &str,
) -> Result<Deployment> {
    let current = refresh_impl(conn, config, deployment_id)?;
    match current.status {
        DeploymentStatus::Success => Ok(current),
        DeploymentStatus::Pending => Err(ExError::new(ExErrorKind::Conflict)
            .with_op("retry_deployment")
            .with_entity_id(deployment_id)
            .with_project_id(current.project_id)
            .with_message("deployment is still in flight")),
        DeploymentStatus::Failed => deploy_impl(
            conn,
            cas,
            publisher,
            config,
            &current.project_id,
            &current.snapshot_id,
        ),
    }
}

/// Deployments of a project, newest first
///
/// # Errors
///
/// Returns `NotFound` if the project does not exist.
pub fn list_deployments(conn: &Connection, project_id: &str) -> Result<Vec<Deployment>> {
    SqliteRepo::require_project(conn, project_id, "list_deployments")?;
    SqliteRepo::list_deployments(conn, project_id)
}
