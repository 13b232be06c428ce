//! Parsing of AI-generated edit responses into whole-file patches.
//!
//! A response carries zero or more blocks:
//!
//! ```text
//! === FILE: src/app.js ===
//! console.log("hi");
//! === END FILE ===
//! ```
//!
//! Each block replaces the named file's content entirely. Text outside the
//! blocks (explanations, greetings) is ignored.

use serde::{Deserialize, Serialize};

use crate::errors::{CoreResult, VibeError};

const FILE_OPEN_PREFIX: &str = "=== FILE:";
const FILE_OPEN_SUFFIX: &str = "===";
const FILE_CLOSE: &str = "=== END FILE ===";

/// One full-content replacement of a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePatch {
    pub path: String,
    pub content: String,
}

impl FilePatch {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

fn open_marker_path(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    let rest = trimmed.strip_prefix(FILE_OPEN_PREFIX)?;
    let path = rest.strip_suffix(FILE_OPEN_SUFFIX)?.trim();
    Some(path)
}

/// Extract patches from a response, in the order they appear
///
/// Paths are returned as written; normalisation happens when the patch is
/// applied to a [`crate::FileSet`].
///
/// # Errors
///
/// Returns `VibeError::PatchParse` when a block opens with an empty path,
/// when a block opens inside another block, or when the response ends
/// before a block is closed. `line` is 1-based and names the offending
/// opening marker.
pub fn parse_patch_response(text: &str) -> CoreResult<Vec<FilePatch>> {
    let mut patches = Vec::new();
    // (path, opening line number, body lines)
    let mut current: Option<(String, usize, Vec<&str>)> = None;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;

        if line.trim() == FILE_CLOSE {
            match current.take() {
                Some((path, _, body)) => patches.push(FilePatch::new(path, body.join("\n"))),
                None => {
                    return Err(VibeError::PatchParse {
                        line: line_no,
                        reason: "END FILE marker without an open block".to_string(),
                    })
                }
            }
            continue;
        }

        if let Some(path) = open_marker_path(line) {
            if let Some((open_path, open_line, _)) = &current {
                return Err(VibeError::PatchParse {
                    line: line_no,
                    reason: format!(
                        "block for '{}' opened at line {} is not closed",
                        open_path, open_line
                    ),
                });
            }
            if path.is_empty() {
                return Err(VibeError::PatchParse {
                    line: line_no,
                    reason: "FILE marker has an empty path".to_string(),
                });
            }
            current = Some((path.to_string(), line_no, Vec::new()));
            continue;
        }

        if let Some((_, _, body)) = current.as_mut() {
            body.push(line);
        }
    }

    if let Some((path, open_line, _)) = current {
        return Err(VibeError::PatchParse {
            line: open_line,
            reason: format!("block for '{}' is never closed", path),
        });
    }

    Ok(patches)
}
