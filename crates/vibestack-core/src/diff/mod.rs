//! Manifest diff engine.
//!
//! Compares two manifests and produces a structured, deterministic diff
//! suitable for review before a restore or deploy.
//!
//! ```ignore
//! use vibestack_core::diff::{compute_diff, render_human_summary};
//!
//! let diff = compute_diff(&older.manifest, &newer.manifest)?;
//! println!("{}", render_human_summary(&diff));
//! ```
//!
//! Because manifest equality is order-sensitive, a pure reordering is
//! reported as its own classification rather than as identical.

pub mod engine;
pub mod human_summary;
pub mod model;

pub use engine::compute_diff;
pub use human_summary::render_human_summary;
pub use model::{DiffClassification, DiffIdentity, FileChange, ManifestDiff};
