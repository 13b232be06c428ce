//! Manifest diff computation.

use std::collections::HashMap;

use crate::diff::model::{DiffClassification, DiffIdentity, FileChange, ManifestDiff};
use crate::errors::CoreResult;
use crate::manifest::{compute_manifest_digest, sha256_hex, Manifest, ManifestEntry};

/// Compare manifest `a` (older) against manifest `b` (newer)
///
/// # Errors
///
/// Returns `VibeError::Serialization` if either manifest fails to encode
/// for its digest.
pub fn compute_diff(a: &Manifest, b: &Manifest) -> CoreResult<ManifestDiff> {
    let identity = DiffIdentity {
        a_manifest_digest: compute_manifest_digest(a)?,
        b_manifest_digest: compute_manifest_digest(b)?,
    };

    let a_index: HashMap<&str, &ManifestEntry> =
        a.entries().iter().map(|e| (e.path.as_str(), e)).collect();
    let b_index: HashMap<&str, &ManifestEntry> =
        b.entries().iter().map(|e| (e.path.as_str(), e)).collect();

    let added: Vec<String> = b
        .paths()
        .filter(|p| !a_index.contains_key(p))
        .map(str::to_string)
        .collect();
    let removed: Vec<String> = a
        .paths()
        .filter(|p| !b_index.contains_key(p))
        .map(str::to_string)
        .collect();

    let modified: Vec<FileChange> = b
        .entries()
        .iter()
        .filter_map(|new| {
            let old = a_index.get(new.path.as_str())?;
            (old.content != new.content).then(|| FileChange {
                path: new.path.clone(),
                old_size: old.content.len(),
                new_size: new.content.len(),
                old_digest: sha256_hex(&old.content),
                new_digest: sha256_hex(&new.content),
            })
        })
        .collect();

    let common_a: Vec<&str> = a.paths().filter(|p| b_index.contains_key(p)).collect();
    let common_b: Vec<&str> = b.paths().filter(|p| a_index.contains_key(p)).collect();
    let ordering_changed = common_a != common_b;

    let classification = if a == b {
        DiffClassification::Identical
    } else if added.is_empty() && removed.is_empty() && modified.is_empty() {
        DiffClassification::Reordered
    } else {
        DiffClassification::Changed
    };

    Ok(ManifestDiff {
        diff_schema_version: 1,
        identity,
        classification,
        added,
        removed,
        modified,
        ordering_changed,
    })
}
