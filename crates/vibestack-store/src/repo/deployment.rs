use rusqlite::{Connection, OptionalExtension, Row};
use vibestack_core::errors::{ExError, ExErrorKind};
use vibestack_core::{Deployment, DeploymentStatus};

use super::SqliteRepo;
use crate::db::now_ms;
use crate::errors::{not_found, sqlite_error, Result};

const DEPLOYMENT_COLUMNS: &str = "id, project_id, snapshot_id, status, target_name, artifact_ref, \
                                  url, error_message, created_at, updated_at";

/// Raw row with the status still as its stored tag
struct DeploymentRow {
    deployment: Deployment,
    status_tag: String,
}

fn row_to_deployment(row: &Row<'_>) -> rusqlite::Result<DeploymentRow> {
    let status_tag: String = row.get(3)?;
    Ok(DeploymentRow {
        deployment: Deployment {
            id: row.get(0)?,
            project_id: row.get(1)?,
            snapshot_id: row.get(2)?,
            status: DeploymentStatus::Pending,
            target_name: row.get(4)?,
            artifact_ref: row.get(5)?,
            url: row.get(6)?,
            error_message: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        },
        status_tag,
    })
}

fn into_deployment(row: DeploymentRow) -> Result<Deployment> {
    let mut deployment = row.deployment;
    deployment.status = DeploymentStatus::parse(&row.status_tag)?;
    Ok(deployment)
}

impl SqliteRepo {
    /// Record a new `Pending` deployment of `snapshot_id`
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the snapshot does not belong to the project.
    pub fn insert_pending_deployment(
        conn: &Connection,
        project_id: &str,
        snapshot_id: &str,
        target_name: &str,
    ) -> Result<Deployment> {
        let owned: bool = conn
            .query_row(
                "SELECT 1 FROM snapshots WHERE id = ?1 AND project_id = ?2",
                [snapshot_id, project_id],
                |_| Ok(true),
            )
            .optional()
            .map_err(|e| sqlite_error("insert_pending_deployment", e))?
            .unwrap_or(false);
        if !owned {
            return Err(not_found("insert_pending_deployment", "snapshot", snapshot_id)
                .with_project_id(project_id));
        }

        let now = now_ms();
        let deployment = Deployment {
            id: uuid::Uuid::now_v7().to_string(),
            project_id: project_id.to_string(),
            snapshot_id: snapshot_id.to_string(),
            status: DeploymentStatus::Pending,
            target_name: target_name.to_string(),
            artifact_ref: None,
            url: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        };

        conn.execute(
            "INSERT INTO deployments (id, project_id, snapshot_id, status, target_name,
                                      created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                deployment.id,
                deployment.project_id,
                deployment.snapshot_id,
                deployment.status.as_str(),
                deployment.target_name,
                now,
                now
            ],
        )
        .map_err(|e| sqlite_error("insert_pending_deployment", e))?;

        Ok(deployment)
    }

    pub fn get_deployment(conn: &Connection, deployment_id: &str) -> Result<Option<Deployment>> {
        conn.query_row(
            &format!(
                "SELECT {} FROM deployments WHERE id = ?1",
                DEPLOYMENT_COLUMNS
            ),
            [deployment_id],
            row_to_deployment,
        )
        .optional()
        .map_err(|e| sqlite_error("get_deployment", e))?
        .map(into_deployment)
        .transpose()
    }

    /// Deployments of a project, newest first
    pub fn list_deployments(conn: &Connection, project_id: &str) -> Result<Vec<Deployment>> {
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM deployments WHERE project_id = ?1 ORDER BY rowid DESC",
                DEPLOYMENT_COLUMNS
            ))
            .map_err(|e| sqlite_error("list_deployments", e))?;
        let rows = stmt
            .query_map([project_id], row_to_deployment)
            .map_err(|e| sqlite_error("list_deployments", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| sqlite_error("list_deployments", e))?;
        rows.into_iter().map(into_deployment).collect()
    }

    /// Attach the stored artifact digest to a still-pending deployment
    ///
    /// Returns whether the row was updated; a deployment finalised in the
    /// meantime (cancelled, timed out) is left untouched.
    pub fn set_deployment_artifact(
        conn: &Connection,
        deployment_id: &str,
        artifact_ref: &str,
    ) -> Result<bool> {
        let updated = conn
            .execute(
                "UPDATE deployments SET artifact_ref = ?1, updated_at = ?2
                 WHERE id = ?3 AND status = 'pending'",
                rusqlite::params![artifact_ref, now_ms(), deployment_id],
            )
            .map_err(|e| sqlite_error("set_deployment_artifact", e))?;
        Ok(updated == 1)
    }

    /// Move a `Pending` deployment to its terminal status, exactly once
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` if `status` is not terminal or the deployment
    ///   was already finalised
    /// - `NotFound` if the deployment does not exist
    pub fn finalize_deployment(
        conn: &Connection,
        deployment_id: &str,
        status: DeploymentStatus,
        url: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<Deployment> {
        if !DeploymentStatus::Pending.can_transition_to(status) {
            return Err(ExError::new(ExErrorKind::InvalidTransition)
                .with_op("finalize_deployment")
                .with_entity_id(deployment_id)
                .with_message(format!("cannot finalise a deployment as {}", status)));
        }

        let updated = conn
            .execute(
                "UPDATE deployments SET status = ?1, url = ?2, error_message = ?3, updated_at = ?4
                 WHERE id = ?5 AND status = 'pending'",
                rusqlite::params![status.as_str(), url, error_message, now_ms(), deployment_id],
            )
            .map_err(|e| sqlite_error("finalize_deployment", e))?;

        let current = Self::get_deployment(conn, deployment_id)?
            .ok_or_else(|| not_found("finalize_deployment", "deployment", deployment_id))?;

        if updated == 0 {
            return Err(ExError::new(ExErrorKind::InvalidTransition)
                .with_op("finalize_deployment")
                .with_entity_id(deployment_id)
                .with_project_id(current.project_id)
                .with_message(format!("deployment is already {}", current.status)));
        }

        Ok(current)
    }
}
