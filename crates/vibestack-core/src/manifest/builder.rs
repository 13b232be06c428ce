//! Manifest construction and its inverse.

use serde::{Deserialize, Serialize};

use crate::model::{FileSet, Language};

/// One `(path, content)` pair of a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: String,
    #[serde(with = "super::codec::base64_bytes")]
    pub content: Vec<u8>,
}

/// Immutable ordered sequence of manifest entries
///
/// Equality is element-wise and order-sensitive: the same files captured in
/// a different order are a different manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Build a manifest from raw entries, keeping their order
    ///
    /// Entries are expected to carry distinct, normalised paths; the
    /// decoder and [`ManifestBuilder::build`] guarantee this.
    pub fn from_entries(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn get(&self, path: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.path.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total content size in bytes
    pub fn content_bytes(&self) -> usize {
        self.entries.iter().map(|e| e.content.len()).sum()
    }
}

/// Converts between working copies and manifests
pub struct ManifestBuilder;

impl ManifestBuilder {
    /// Capture `files` in its current iteration order
    ///
    /// Pure: the same FileSet state always yields an equal manifest.
    pub fn build(files: &FileSet) -> Manifest {
        Manifest {
            entries: files
                .list()
                .map(|entry| ManifestEntry {
                    path: entry.path.clone(),
                    content: entry.content.clone(),
                })
                .collect(),
        }
    }

    /// Rebuild a fresh working copy by inserting entries in manifest order
    ///
    /// Languages are re-derived from the paths and the result is clean.
    pub fn materialize(manifest: &Manifest) -> FileSet {
        let mut files = FileSet::new();
        for entry in manifest.entries() {
            // Manifest paths were normalised when they entered a FileSet, so
            // re-normalisation cannot fail for manifests we produced.
            if files
                .upsert(
                    &entry.path,
                    entry.content.clone(),
                    Language::from_path(&entry.path),
                )
                .is_err()
            {
                tracing::warn!(path = %entry.path, "skipping manifest entry with invalid path");
            }
        }
        files.mark_clean();
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FileSet {
        let mut files = FileSet::new();
        files.upsert_detected("/index.html", "<h1>Hi</h1>").unwrap();
        files.upsert_detected("/style.css", "body{color:red}").unwrap();
        files
    }

    #[test]
    fn test_build_follows_iteration_order() {
        let manifest = ManifestBuilder::build(&sample());
        let paths: Vec<&str> = manifest.paths().collect();
        assert_eq!(paths, vec!["/index.html", "/style.css"]);
        assert_eq!(manifest.get("/style.css").unwrap().content, b"body{color:red}");
    }

    #[test]
    fn test_build_is_pure() {
        let files = sample();
        assert_eq!(ManifestBuilder::build(&files), ManifestBuilder::build(&files));
    }

    #[test]
    fn test_equality_is_order_sensitive() {
        let mut reversed = FileSet::new();
        reversed.upsert_detected("/style.css", "body{color:red}").unwrap();
        reversed.upsert_detected("/index.html", "<h1>Hi</h1>").unwrap();

        assert_ne!(
            ManifestBuilder::build(&sample()),
            ManifestBuilder::build(&reversed)
        );
    }

    #[test]
    fn test_materialize_round_trip_is_clean() {
        let files = sample();
        let rebuilt = ManifestBuilder::materialize(&ManifestBuilder::build(&files));

        assert!(!rebuilt.is_dirty());
        let original: Vec<(&str, &[u8])> =
            files.list().map(|e| (e.path.as_str(), e.content.as_slice())).collect();
        let restored: Vec<(&str, &[u8])> = rebuilt
            .list()
            .map(|e| (e.path.as_str(), e.content.as_slice()))
            .collect();
        assert_eq!(original, restored);
        assert_eq!(rebuilt.get("/index.html").unwrap().language, Language::Html);
    }

    #[test]
    fn test_empty_file_set_builds_empty_manifest() {
        let manifest = ManifestBuilder::build(&FileSet::new());
        assert!(manifest.is_empty());
        assert_eq!(manifest.content_bytes(), 0);
        assert!(ManifestBuilder::materialize(&manifest).is_empty());
    }
}
