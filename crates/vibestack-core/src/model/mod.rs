//! Domain models
//!
//! - `FileSet` / `FileEntry`: the mutable working copy of a project
//! - `Language`: closed set of editor languages detected from extensions
//! - `Project`, `Snapshot`, `Branch`, `Deployment`: plain data records
//!   returned by the store and the engine

pub mod file_set;
pub mod language;
pub mod path;
pub mod records;

pub use file_set::{FileEntry, FileSet};
pub use language::Language;
pub use path::normalize_path;
pub use records::{Branch, Deployment, DeploymentStatus, Project, Snapshot};
