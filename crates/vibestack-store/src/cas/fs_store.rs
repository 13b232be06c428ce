//! Filesystem-based Content-Addressable Storage
//!
//! Provides atomic writes, collision detection, and content-addressed reads

use std::fs;
use std::path::{Path, PathBuf};

use vibestack_core::manifest::sha256_hex;

use crate::cas::atomic::atomic_write;
use crate::cas::sharding::{is_valid_digest, shard_path};
use crate::errors::{cas_collision, cas_corrupt, cas_missing, io_error, Result};

/// What a blob holds; decides the file extension on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobKind {
    /// Canonical manifest JSON
    Manifest,
    /// Rendered worker script
    Artifact,
}

impl BlobKind {
    pub const ALL: [BlobKind; 2] = [BlobKind::Manifest, BlobKind::Artifact];

    pub fn extension(&self) -> &'static str {
        match self {
            BlobKind::Manifest => "json",
            BlobKind::Artifact => "js",
        }
    }
}

/// Filesystem-based CAS store
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Create a new CAS store at the given root directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write content to CAS and return the digest
    ///
    /// - Computes SHA256 digest
    /// - Writes atomically using temp→rename
    /// - Idempotent: writing same content twice succeeds
    /// - Detects collisions: different content under an existing digest fails
    pub fn write(&self, content: &[u8], kind: BlobKind) -> Result<String> {
        let digest = sha256_hex(content);
        let target_path = shard_path(&self.root, &digest, kind.extension());

        if target_path.exists() {
            let existing = fs::read(&target_path).map_err(|e| io_error("read_cas", e))?;
            if existing == content {
                return Ok(digest);
            }
            return Err(cas_collision(&digest));
        }

        atomic_write(&target_path, content)?;

        tracing::debug!(
            digest = %digest,
            size_bytes = content.len(),
            kind = kind.extension(),
            "Wrote CAS blob"
        );

        Ok(digest)
    }

    /// Read content from CAS by digest
    ///
    /// Verifies the bytes still hash to `digest`.
    pub fn read(&self, digest: &str) -> Result<Vec<u8>> {
        let path = self.locate(digest).ok_or_else(|| cas_missing(digest))?;
        let content = fs::read(&path).map_err(|e| io_error("read_cas", e))?;
        if sha256_hex(&content) != digest {
            return Err(cas_corrupt(digest));
        }
        Ok(content)
    }

    /// Whether a blob with this digest is present
    pub fn contains(&self, digest: &str) -> bool {
        self.locate(digest).is_some()
    }

    fn locate(&self, digest: &str) -> Option<PathBuf> {
        if !is_valid_digest(digest) {
            return None;
        }
        BlobKind::ALL
            .iter()
            .map(|kind| shard_path(&self.root, digest, kind.extension()))
            .find(|path| path.exists())
    }
}
