//! Manifest diff output types.

use serde::{Deserialize, Serialize};

/// Structured diff between manifest A (older) and manifest B (newer)
///
/// All collections are populated even when empty so callers can process
/// every diff uniformly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManifestDiff {
    /// Schema version of this structure (always 1)
    pub diff_schema_version: u32,
    pub identity: DiffIdentity,
    pub classification: DiffClassification,
    /// Paths in B but not A, in B's order
    pub added: Vec<String>,
    /// Paths in A but not B, in A's order
    pub removed: Vec<String>,
    /// Paths in both whose content differs, in B's order
    pub modified: Vec<FileChange>,
    /// True if the paths present in both appear in a different relative order
    pub ordering_changed: bool,
}

impl ManifestDiff {
    pub fn is_identical(&self) -> bool {
        self.classification == DiffClassification::Identical
    }
}

/// Manifest digests of both sides
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiffIdentity {
    pub a_manifest_digest: String,
    pub b_manifest_digest: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DiffClassification {
    /// Element-wise equal manifests
    Identical,
    /// Same paths and contents, different order
    Reordered,
    /// At least one path added, removed or modified
    Changed,
}

impl DiffClassification {
    pub fn label(&self) -> &'static str {
        match self {
            DiffClassification::Identical => "Identical",
            DiffClassification::Reordered => "Reordered",
            DiffClassification::Changed => "Changed",
        }
    }
}

/// Content change for one path present on both sides
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileChange {
    pub path: String,
    pub old_size: usize,
    pub new_size: usize,
    pub old_digest: String,
    pub new_digest: String,
}
