//! Sharding logic for CAS
//!
//! Blobs live in subdirectories named by the first 2 hex characters of
//! their digest so no single directory grows without bound.

use std::path::{Path, PathBuf};

/// Compute the shard path for a given digest
///
/// For digest "abc123...", returns "<root>/ab/abc123.<ext>"
pub fn shard_path(root: &Path, digest: &str, extension: &str) -> PathBuf {
    let shard = digest.get(..2).unwrap_or(digest);
    root.join(shard).join(format!("{}.{}", digest, extension))
}

/// Whether `digest` looks like a hex SHA-256 (guards against path tricks)
pub fn is_valid_digest(digest: &str) -> bool {
    digest.len() == 64 && digest.bytes().all(|b| b.is_ascii_hexdigit())
}
