//! Digest computation for manifests.
//!
//! Same input bytes give the same digest; a different entry order gives a
//! different digest, matching manifest equality.

use sha2::{Digest, Sha256};

use crate::errors::CoreResult;
use crate::manifest::builder::Manifest;
use crate::manifest::codec::encode_manifest;

/// Hex-encoded SHA-256 of the manifest's canonical encoding
///
/// This is the key under which the manifest blob is stored.
///
/// # Errors
///
/// Returns `VibeError::Serialization` if encoding fails.
pub fn compute_manifest_digest(manifest: &Manifest) -> CoreResult<String> {
    Ok(sha256_hex(&encode_manifest(manifest)?))
}

/// Hex-encoded SHA-256 of arbitrary bytes (64 characters)
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::builder::ManifestEntry;

    fn entry(path: &str, content: &str) -> ManifestEntry {
        ManifestEntry {
            path: path.to_string(),
            content: content.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_sha256_hex_known_value() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_digest_is_deterministic_and_order_sensitive() {
        let a = Manifest::from_entries(vec![entry("/a", "1"), entry("/b", "2")]);
        let b = Manifest::from_entries(vec![entry("/b", "2"), entry("/a", "1")]);

        let da = compute_manifest_digest(&a).unwrap();
        assert_eq!(da.len(), 64);
        assert_eq!(da, compute_manifest_digest(&a.clone()).unwrap());
        assert_ne!(da, compute_manifest_digest(&b).unwrap());
    }
}
