//! Manifests: immutable, ordered captures of a working copy.
//!
//! ## Responsibilities
//!
//! - Capture a [`crate::FileSet`] as an ordered `(path, content)` sequence
//! - Rebuild a fresh working copy from a manifest (`materialize`)
//! - Canonical JSON encoding and SHA-256 digest used as the blob key
//!
//! ## Non-Responsibilities
//!
//! - Persistence (handled by `vibestack-store`)
//! - Branch bookkeeping (handled by `vibestack-engine`)

pub mod builder;
pub mod codec;
pub mod digest;

pub use builder::{Manifest, ManifestBuilder, ManifestEntry};
pub use codec::{decode_manifest, encode_manifest, MANIFEST_SCHEMA_VERSION};
pub use digest::{compute_manifest_digest, sha256_hex};
