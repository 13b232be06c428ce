//! Human-readable summary renderer for manifest diffs.

use crate::diff::model::{DiffClassification, ManifestDiff};

/// Render a short Markdown summary of a [`ManifestDiff`]
pub fn render_human_summary(diff: &ManifestDiff) -> String {
    let mut out = String::new();

    out.push_str("## Manifest Diff\n\n");
    out.push_str(&format!(
        "**Classification**: {}\n\n",
        diff.classification.label()
    ));
    out.push_str(&format!(
        "| | Manifest Digest |\n|---|---|\n| A | `{}` |\n| B | `{}` |\n\n",
        short(&diff.identity.a_manifest_digest),
        short(&diff.identity.b_manifest_digest),
    ));

    match diff.classification {
        DiffClassification::Identical => {
            out.push_str("_No changes._\n");
            return out;
        }
        DiffClassification::Reordered => {
            out.push_str("_Same files and contents; only the order changed._\n");
            return out;
        }
        DiffClassification::Changed => {}
    }

    if !diff.added.is_empty() {
        out.push_str(&format!("### Added ({})\n\n", diff.added.len()));
        for path in &diff.added {
            out.push_str(&format!("- `{}`\n", path));
        }
        out.push('\n');
    }

    if !diff.removed.is_empty() {
        out.push_str(&format!("### Removed ({})\n\n", diff.removed.len()));
        for path in &diff.removed {
            out.push_str(&format!("- `{}`\n", path));
        }
        out.push('\n');
    }

    if !diff.modified.is_empty() {
        out.push_str(&format!("### Modified ({})\n\n", diff.modified.len()));
        for change in &diff.modified {
            out.push_str(&format!(
                "- `{}` ({} -> {} bytes)\n",
                change.path, change.old_size, change.new_size
            ));
        }
        out.push('\n');
    }

    if diff.ordering_changed {
        out.push_str("- **Ordering changed**\n");
    }

    out
}

/// First 12 characters of a digest
fn short(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::compute_diff;
    use crate::manifest::{Manifest, ManifestEntry};

    fn manifest(entries: &[(&str, &str)]) -> Manifest {
        Manifest::from_entries(
            entries
                .iter()
                .map(|(p, c)| ManifestEntry {
                    path: p.to_string(),
                    content: c.as_bytes().to_vec(),
                })
                .collect(),
        )
    }

    #[test]
    fn test_identical_summary_is_short() {
        let m = manifest(&[("/a", "1")]);
        let text = render_human_summary(&compute_diff(&m, &m).unwrap());
        assert!(text.contains("**Classification**: Identical"));
        assert!(text.contains("_No changes._"));
        assert!(!text.contains("### Added"));
    }

    #[test]
    fn test_changed_summary_lists_sections() {
        let a = manifest(&[("/index.html", "A"), ("/old.js", "x")]);
        let b = manifest(&[("/index.html", "BB"), ("/new.css", "y")]);
        let text = render_human_summary(&compute_diff(&a, &b).unwrap());
        assert!(text.contains("### Added (1)"));
        assert!(text.contains("- `/new.css`"));
        assert!(text.contains("### Removed (1)"));
        assert!(text.contains("- `/index.html` (1 -> 2 bytes)"));
    }

    #[test]
    fn test_short_handles_short_input() {
        assert_eq!(short("abc"), "abc");
        assert_eq!(short("0123456789abcdef"), "0123456789ab");
    }
}
