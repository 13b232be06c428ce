//! Checksum validation for migrations
//!
//! Computes SHA256 checksums of migration SQL to detect edits to migrations
//! that were already applied

use vibestack_core::manifest::sha256_hex;

/// Compute SHA256 checksum of a string
pub fn compute_checksum(content: &str) -> String {
    sha256_hex(content.as_bytes())
}
