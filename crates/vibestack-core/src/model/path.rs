//! Project file path normalisation.

use crate::errors::{CoreResult, VibeError};

/// Normalise a project file path to its canonical `/a/b.ext` form
///
/// Accepts paths with or without a leading slash so AI patch paths and
/// request paths agree. Rejects anything that could escape the project root
/// or alias another entry.
///
/// # Errors
///
/// Returns `VibeError::InvalidPath` for empty paths, `.`/`..` or empty
/// segments, backslashes and NUL bytes.
pub fn normalize_path(raw: &str) -> CoreResult<String> {
    let invalid = |reason: &str| VibeError::InvalidPath {
        path: raw.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = raw.trim();
    let body = trimmed.strip_prefix('/').unwrap_or(trimmed);
    if body.is_empty() {
        return Err(invalid("path is empty"));
    }
    if body.contains('\\') {
        return Err(invalid("backslashes are not allowed"));
    }
    if body.contains('\0') {
        return Err(invalid("NUL bytes are not allowed"));
    }
    for segment in body.split('/') {
        match segment {
            "" => return Err(invalid("empty path segment")),
            "." | ".." => return Err(invalid("relative segments are not allowed")),
            _ => {}
        }
    }

    Ok(format!("/{}", body))
}
