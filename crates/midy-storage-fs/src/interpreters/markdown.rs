//! Markdown pages with YAML frontmatter.
//!
//! ```markdown
//! ---
//! title: Getting Started
//! tags: [guide]
//! ---
//!
//! # Getting Started
//! ```
//!
//! Without a `title` key the first `# H1` heading is used.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use midy_storage::{FileInterpreter, LogicalPath, ParsedFrontmatter};
use regex::Regex;

use crate::yaml::{into_frontmatter, parse_mapping};

static H1_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#\s+(.+)$").unwrap());

/// Interpreter for `.md` and `.markdown` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownInterpreter;

impl FileInterpreter for MarkdownInterpreter {
    fn supported_extensions(&self) -> &[&'static str] {
        &["md", "markdown"]
    }

    fn map(&self, file: &Path, _parent: &LogicalPath, _basename: &str) -> Option<ParsedFrontmatter> {
        let content = match fs::read_to_string(file) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = %file.display(), error = %e, "Failed to read markdown file");
                return None;
            }
        };

        let (header, body) = split_frontmatter(&content);
        let mut parsed = into_frontmatter(parse_mapping(header.unwrap_or(""), file), true, false);
        if parsed.title.is_none() {
            parsed.title = extract_h1(body);
        }
        Some(parsed)
    }
}

/// Split a leading `---` block from the body.
///
/// Returns `(None, content)` when there is no complete frontmatter block.
pub(crate) fn split_frontmatter(content: &str) -> (Option<&str>, &str) {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let Some(rest) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return (None, content);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let header = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(header), body);
        }
        offset += line.len();
    }
    (None, content)
}

fn extract_h1(body: &str) -> Option<String> {
    H1_RE
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_owned())
        .filter(|title| !title.is_empty())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn map(content: &str) -> ParsedFrontmatter {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("page.md");
        fs::write(&file, content).unwrap();
        MarkdownInterpreter
            .map(&file, &LogicalPath::root(), "page")
            .unwrap()
    }

    #[test]
    fn test_split_frontmatter() {
        let (header, body) = split_frontmatter("---\ntitle: A\n---\n# Body\n");
        assert_eq!(header, Some("title: A\n"));
        assert_eq!(body, "# Body\n");
    }

    #[test]
    fn test_split_frontmatter_unclosed() {
        let content = "---\ntitle: A\n# Body\n";
        assert_eq!(split_frontmatter(content), (None, content));
    }

    #[test]
    fn test_split_frontmatter_absent() {
        assert_eq!(split_frontmatter("# Title"), (None, "# Title"));
    }

    #[test]
    fn test_frontmatter_title_wins_over_h1() {
        let parsed = map("---\ntitle: Front\nsummary: S\n---\n\n# Heading\n");
        assert_eq!(parsed.title.as_deref(), Some("Front"));
        assert_eq!(parsed.summary, "S");
        assert!(parsed.routable);
        assert!(!parsed.hidden);
    }

    #[test]
    fn test_h1_fallback() {
        let parsed = map("Intro text\n\n# The Heading\n\n## Sub\n");
        assert_eq!(parsed.title.as_deref(), Some("The Heading"));
    }

    #[test]
    fn test_no_title() {
        let parsed = map("just text");
        assert_eq!(parsed.title, None);
    }

    #[test]
    fn test_crlf_frontmatter() {
        let parsed = map("---\r\ntitle: Windows\r\n---\r\nbody");
        assert_eq!(parsed.title.as_deref(), Some("Windows"));
    }

    #[test]
    fn test_unreadable_file_not_supported() {
        let dir = tempfile::tempdir().unwrap();
        let parsed = MarkdownInterpreter.map(&dir.path().join("gone.md"), &LogicalPath::root(), "gone");
        assert!(parsed.is_none());
    }
}
