//! The live, mutable working copy of a project.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::CoreResult;
use crate::model::language::Language;
use crate::model::path::normalize_path;
use crate::patch::FilePatch;

/// A single file in a working copy
///
/// Identity is `path`, unique within its [`FileSet`]. `content` is opaque
/// bytes to this layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    pub content: Vec<u8>,
    pub language: Language,
    /// Set by `upsert`, cleared by [`FileSet::mark_clean`]
    pub modified: bool,
}

impl FileEntry {
    /// Content as UTF-8 text, if it is valid UTF-8
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }
}

/// Ordered mapping from path to [`FileEntry`]
///
/// Iteration follows insertion order: a new path is appended at the end,
/// replacing an existing path keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    entries: IndexMap<String, FileEntry>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the file at `path`
    ///
    /// # Errors
    ///
    /// Returns `VibeError::InvalidPath` if `path` does not normalise.
    pub fn upsert(
        &mut self,
        path: &str,
        content: impl Into<Vec<u8>>,
        language: Language,
    ) -> CoreResult<()> {
        let path = normalize_path(path)?;
        let content = content.into();
        match self.entries.get_mut(&path) {
            Some(entry) => {
                entry.content = content;
                entry.language = language;
                entry.modified = true;
            }
            None => {
                self.entries.insert(
                    path.clone(),
                    FileEntry {
                        path,
                        content,
                        language,
                        modified: true,
                    },
                );
            }
        }
        Ok(())
    }

    /// Like [`FileSet::upsert`] with the language detected from the path
    ///
    /// # Errors
    ///
    /// Returns `VibeError::InvalidPath` if `path` does not normalise.
    pub fn upsert_detected(&mut self, path: &str, content: impl Into<Vec<u8>>) -> CoreResult<()> {
        let language = Language::from_path(path.trim());
        self.upsert(path, content, language)
    }

    /// Remove the file at `path`; a missing or malformed path is a no-op
    ///
    /// Returns whether an entry was removed.
    pub fn remove(&mut self, path: &str) -> bool {
        match normalize_path(path) {
            Ok(path) => self.entries.shift_remove(&path).is_some(),
            Err(_) => false,
        }
    }

    pub fn get(&self, path: &str) -> Option<&FileEntry> {
        let path = normalize_path(path).ok()?;
        self.entries.get(&path)
    }

    /// Entries in iteration order
    pub fn list(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.values()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any entry changed since the last [`FileSet::mark_clean`]
    pub fn is_dirty(&self) -> bool {
        self.entries.values().any(|e| e.modified)
    }

    /// Clear every entry's `modified` flag (after a checkpoint or save)
    pub fn mark_clean(&mut self) {
        for entry in self.entries.values_mut() {
            entry.modified = false;
        }
    }

    /// Apply AI-generated patches in order, each as a full-content upsert
    ///
    /// Validation happens before any mutation, so a bad path leaves the
    /// working copy untouched.
    ///
    /// # Errors
    ///
    /// Returns `VibeError::InvalidPath` for the first patch whose path does
    /// not normalise.
    pub fn apply_patches(&mut self, patches: &[FilePatch]) -> CoreResult<usize> {
        for patch in patches {
            normalize_path(&patch.path)?;
        }
        for patch in patches {
            self.upsert_detected(&patch.path, patch.content.as_bytes())?;
        }
        Ok(patches.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(set: &FileSet) -> Vec<&str> {
        set.paths().collect()
    }

    #[test]
    fn test_new_paths_append_in_insertion_order() {
        let mut set = FileSet::new();
        set.upsert_detected("/index.html", "<h1>A</h1>").unwrap();
        set.upsert_detected("/style.css", "body{}").unwrap();
        set.upsert_detected("/app.js", "1").unwrap();

        assert_eq!(paths(&set), vec!["/index.html", "/style.css", "/app.js"]);
        assert_eq!(set.get("/style.css").unwrap().language, Language::Css);
    }

    #[test]
    fn test_upsert_existing_path_keeps_position_and_marks_modified() {
        let mut set = FileSet::new();
        set.upsert_detected("/index.html", "<h1>A</h1>").unwrap();
        set.upsert_detected("/style.css", "body{}").unwrap();
        set.mark_clean();

        set.upsert_detected("index.html", "<h1>B</h1>").unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(paths(&set), vec!["/index.html", "/style.css"]);
        let entry = set.get("/index.html").unwrap();
        assert_eq!(entry.text(), Some("<h1>B</h1>"));
        assert!(entry.modified);
        assert!(!set.get("/style.css").unwrap().modified);
    }

    #[test]
    fn test_remove_missing_path_is_noop() {
        let mut set = FileSet::new();
        set.upsert_detected("/a.txt", "a").unwrap();

        assert!(!set.remove("/missing.txt"));
        assert!(!set.remove("../../etc"));
        assert!(set.remove("/a.txt"));
        assert!(!set.remove("/a.txt"));
        assert!(set.is_empty());
    }

    #[test]
    fn test_remove_preserves_order_of_remaining_entries() {
        let mut set = FileSet::new();
        for p in ["/a", "/b", "/c"] {
            set.upsert_detected(p, "x").unwrap();
        }
        set.remove("/b");
        assert_eq!(paths(&set), vec!["/a", "/c"]);
    }

    #[test]
    fn test_dirty_tracking() {
        let mut set = FileSet::new();
        assert!(!set.is_dirty());
        set.upsert_detected("/a", "x").unwrap();
        assert!(set.is_dirty());
        set.mark_clean();
        assert!(!set.is_dirty());
    }

    #[test]
    fn test_apply_patches_upserts_and_is_all_or_nothing_on_bad_path() {
        let mut set = FileSet::new();
        set.upsert_detected("/index.html", "old").unwrap();

        let bad = vec![
            FilePatch::new("index.html", "new"),
            FilePatch::new("../escape", "x"),
        ];
        assert!(set.apply_patches(&bad).is_err());
        assert_eq!(set.get("/index.html").unwrap().text(), Some("old"));

        let good = vec![
            FilePatch::new("index.html", "new"),
            FilePatch::new("src/app.js", "console.log(1)"),
        ];
        assert_eq!(set.apply_patches(&good).unwrap(), 2);
        assert_eq!(set.get("/index.html").unwrap().text(), Some("new"));
        assert_eq!(
            set.get("/src/app.js").unwrap().language,
            Language::JavaScript
        );
        assert_eq!(paths(&set), vec!["/index.html", "/src/app.js"]);
    }
}
