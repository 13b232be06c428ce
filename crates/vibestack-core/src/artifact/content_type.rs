//! Extension to content-type table.

use serde::{Deserialize, Serialize};

/// Content types an artifact can serve
///
/// A closed set: anything not listed is served as `text/plain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    Html,
    Css,
    Javascript,
    Json,
    PlainText,
}

impl ContentType {
    pub const ALL: [ContentType; 5] = [
        ContentType::Html,
        ContentType::Css,
        ContentType::Javascript,
        ContentType::Json,
        ContentType::PlainText,
    ];

    /// Map a bare extension (without the dot, case-insensitive)
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "html" => ContentType::Html,
            "css" => ContentType::Css,
            "js" => ContentType::Javascript,
            "json" => ContentType::Json,
            _ => ContentType::PlainText,
        }
    }

    /// Content type for a request or file path, from its last segment
    pub fn from_path(path: &str) -> Self {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        match file_name.rsplit_once('.') {
            Some((_, ext)) => Self::from_extension(ext),
            None => ContentType::PlainText,
        }
    }

    /// The extension keyed in the table, `None` for the default
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            ContentType::Html => Some("html"),
            ContentType::Css => Some("css"),
            ContentType::Javascript => Some("js"),
            ContentType::Json => Some("json"),
            ContentType::PlainText => None,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ContentType::Html => "text/html",
            ContentType::Css => "text/css",
            ContentType::Javascript => "application/javascript",
            ContentType::Json => "application/json",
            ContentType::PlainText => "text/plain",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mime())
    }
}
