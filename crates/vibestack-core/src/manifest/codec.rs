//! Canonical JSON encoding for manifests.
//!
//! ```json
//! {"manifest_schema_version":1,"entries":[{"path":"/index.html","content":"PGgxPkhpPC9oMT4="}]}
//! ```
//!
//! Content is standard base64 so binary files survive. Field order is fixed
//! by the struct layout, which keeps the bytes (and so the digest)
//! deterministic.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::{CoreResult, VibeError};
use crate::manifest::builder::{Manifest, ManifestEntry};
use crate::model::normalize_path;

/// Current manifest schema version
pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
struct ManifestDocumentRef<'a> {
    manifest_schema_version: u32,
    entries: &'a [ManifestEntry],
}

#[derive(Deserialize)]
struct ManifestDocument {
    manifest_schema_version: u32,
    entries: Vec<ManifestEntry>,
}

/// Serialise a manifest to its canonical bytes
///
/// # Errors
///
/// Returns `VibeError::Serialization` if JSON encoding fails.
pub fn encode_manifest(manifest: &Manifest) -> CoreResult<Vec<u8>> {
    let doc = ManifestDocumentRef {
        manifest_schema_version: MANIFEST_SCHEMA_VERSION,
        entries: manifest.entries(),
    };
    Ok(serde_json::to_vec(&doc)?)
}

/// Parse canonical manifest bytes
///
/// # Errors
///
/// Returns `VibeError::InvalidManifest` for malformed JSON, invalid base64,
/// an unknown schema version, or entries whose paths are not normalised or
/// repeat.
pub fn decode_manifest(bytes: &[u8]) -> CoreResult<Manifest> {
    let doc: ManifestDocument =
        serde_json::from_slice(bytes).map_err(|e| VibeError::InvalidManifest {
            reason: e.to_string(),
        })?;

    if doc.manifest_schema_version != MANIFEST_SCHEMA_VERSION {
        return Err(VibeError::InvalidManifest {
            reason: format!(
                "unsupported manifest_schema_version {}",
                doc.manifest_schema_version
            ),
        });
    }

    let mut seen = HashSet::with_capacity(doc.entries.len());
    for entry in &doc.entries {
        match normalize_path(&entry.path) {
            Ok(normalized) if normalized == entry.path => {}
            _ => {
                return Err(VibeError::InvalidManifest {
                    reason: format!("entry path '{}' is not normalised", entry.path),
                })
            }
        }
        if !seen.insert(entry.path.as_str()) {
            return Err(VibeError::InvalidManifest {
                reason: format!("duplicate entry path '{}'", entry.path),
            });
        }
    }

    Ok(Manifest::from_entries(doc.entries))
}

/// Serde adapter storing byte content as standard base64
pub(crate) mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
