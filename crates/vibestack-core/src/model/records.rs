//! Plain data records exchanged between the store, the engine and the UI.
//!
//! None of these hold store handles; every field is owned data.

use serde::{Deserialize, Serialize};

use crate::errors::{ExError, ExErrorKind, Result};
use crate::manifest::Manifest;

/// A project owning one working copy, its branches and snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    /// Unix milliseconds, display only
    pub created_at: i64,
}

/// Immutable checkpoint of a project's files
///
/// `parent_id` links to the previous head of the branch the snapshot was
/// appended to; history order comes from this chain, never from
/// `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub project_id: String,
    pub branch_id: String,
    pub parent_id: Option<String>,
    pub message: String,
    #[serde(default)]
    pub description: Option<String>,
    pub manifest: Manifest,
    /// Content address of the persisted manifest blob
    pub manifest_digest: String,
    /// Unix milliseconds, display only
    pub created_at: i64,
}

/// Named, mutable pointer to the latest snapshot of one line of history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: String,
    pub project_id: String,
    pub name: String,
    /// `None` until the first checkpoint on an implicitly created branch
    pub head_snapshot_id: Option<String>,
    pub created_at: i64,
}

/// Deployment lifecycle state
///
/// `Pending` transitions exactly once to `Success` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    Pending,
    Success,
    Failed,
}

impl DeploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::Pending => "pending",
            DeploymentStatus::Success => "success",
            DeploymentStatus::Failed => "failed",
        }
    }

    /// Parse a stored status tag
    ///
    /// # Errors
    ///
    /// Returns `Persistence` for tags this build does not know.
    pub fn parse(tag: &str) -> Result<Self> {
        match tag {
            "pending" => Ok(DeploymentStatus::Pending),
            "success" => Ok(DeploymentStatus::Success),
            "failed" => Ok(DeploymentStatus::Failed),
            other => Err(ExError::new(ExErrorKind::Persistence)
                .with_op("parse_deployment_status")
                .with_message(format!("unknown deployment status '{}'", other))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, DeploymentStatus::Pending)
    }

    /// Whether the lifecycle allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: DeploymentStatus) -> bool {
        matches!(
            (self, next),
            (DeploymentStatus::Pending, DeploymentStatus::Success)
                | (DeploymentStatus::Pending, DeploymentStatus::Failed)
        )
    }
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One attempt at publishing a snapshot's artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    pub project_id: String,
    pub snapshot_id: String,
    pub status: DeploymentStatus,
    /// Publish target derived from the project id
    pub target_name: String,
    /// Digest of the stored artifact script, once built
    pub artifact_ref: Option<String>,
    pub url: Option<String>,
    pub error_message: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Deployment {
    /// Status as a polling caller must treat it
    ///
    /// A `Pending` deployment older than `timeout_ms` counts as `Failed`.
    pub fn effective_status(&self, now_ms: i64, timeout_ms: i64) -> DeploymentStatus {
        if self.is_stale(now_ms, timeout_ms) {
            DeploymentStatus::Failed
        } else {
            self.status
        }
    }

    /// Pending for longer than `timeout_ms`
    pub fn is_stale(&self, now_ms: i64, timeout_ms: i64) -> bool {
        self.status == DeploymentStatus::Pending
            && now_ms.saturating_sub(self.created_at) > timeout_ms
    }

    /// Turn a failed record into a `PublishFailure` error
    ///
    /// # Errors
    ///
    /// Returns `PublishFailure` carrying the deployment id and the captured
    /// error message when the status is `Failed`.
    pub fn into_result(self) -> Result<Deployment> {
        if self.status == DeploymentStatus::Failed {
            return Err(ExError::new(ExErrorKind::PublishFailure)
                .with_op("deploy")
                .with_entity_id(self.id.clone())
                .with_project_id(self.project_id.clone())
                .with_message(
                    self.error_message
                        .clone()
                        .unwrap_or_else(|| "publish failed".to_string()),
                ));
        }
        Ok(self)
    }
}
