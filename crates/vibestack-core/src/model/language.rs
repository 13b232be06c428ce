//! Editor language detection.

use serde::{Deserialize, Serialize};

/// Language tag attached to every file in a working copy
///
/// Informational for this layer: content stays opaque bytes, the tag only
/// drives editor highlighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    TypeScript,
    JavaScript,
    Html,
    Css,
    Json,
    Markdown,
    Python,
    Sql,
    Shell,
    Yaml,
    PlainText,
}

impl Language {
    /// All variants, in declaration order
    pub const ALL: [Language; 11] = [
        Language::TypeScript,
        Language::JavaScript,
        Language::Html,
        Language::Css,
        Language::Json,
        Language::Markdown,
        Language::Python,
        Language::Sql,
        Language::Shell,
        Language::Yaml,
        Language::PlainText,
    ];

    /// Detect the language from a file path's extension (case-insensitive)
    pub fn from_path(path: &str) -> Self {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        match file_name.rsplit_once('.') {
            Some((_, ext)) => Self::from_extension(ext),
            None => Language::PlainText,
        }
    }

    /// Map a bare extension (without the dot) to a language
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "ts" | "tsx" => Language::TypeScript,
            "js" | "jsx" => Language::JavaScript,
            "html" => Language::Html,
            "css" => Language::Css,
            "json" => Language::Json,
            "md" => Language::Markdown,
            "py" => Language::Python,
            "sql" => Language::Sql,
            "sh" => Language::Shell,
            "yaml" | "yml" => Language::Yaml,
            _ => Language::PlainText,
        }
    }

    /// Stable lowercase tag, as stored in the `files` table
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Html => "html",
            Language::Css => "css",
            Language::Json => "json",
            Language::Markdown => "markdown",
            Language::Python => "python",
            Language::Sql => "sql",
            Language::Shell => "shell",
            Language::Yaml => "yaml",
            Language::PlainText => "plaintext",
        }
    }

    /// Inverse of [`Language::as_str`]; unknown tags fall back to plain text
    pub fn from_tag(tag: &str) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|l| l.as_str() == tag)
            .unwrap_or(Language::PlainText)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
