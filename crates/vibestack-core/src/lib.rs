//! vibestack core - in-memory domain kernel
//!
//! This crate holds everything that does not touch storage:
//! - The working copy (`FileSet`) with path normalisation and language detection
//! - Manifests: ordered, content-addressed captures of a FileSet and their inverse
//! - Artifact building: turning a manifest into a standalone, routable bundle
//! - Manifest diffing and AI patch parsing
//! - Domain records (Snapshot, Branch, Deployment) shared by store and engine
//! - The error and logging facilities used by every other crate

pub mod artifact;
pub mod diff;
pub mod errors;
pub mod logging_facility;
pub mod manifest;
pub mod model;
pub mod patch;

// Re-export commonly used types
pub use artifact::{Artifact, ArtifactBuilder, ContentType};
pub use errors::{ExError, ExErrorKind, Result, VibeError};
pub use manifest::{Manifest, ManifestBuilder, ManifestEntry};
pub use model::{
    Branch, Deployment, DeploymentStatus, FileEntry, FileSet, Language, Project, Snapshot,
};
pub use patch::{parse_patch_response, FilePatch};
