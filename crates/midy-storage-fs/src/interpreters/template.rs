//! Template pages with YAML in a leading comment.
//!
//! ```html
//! {*
//! title: Contact
//! *}
//! <form>...</form>
//! ```
//!
//! Both `{* ... *}` (Latte) and `<!-- ... -->` (HTML) comments are read.

use std::fs;
use std::path::Path;

use midy_storage::{FileInterpreter, LogicalPath, ParsedFrontmatter};

use crate::yaml::{into_frontmatter, parse_mapping};

const COMMENTS: [(&str, &str); 3] = [("{*", "*}"), ("<!--", "-->"), ("{#", "#}")];

/// Interpreter for `.latte`, `.html` and `.twig` templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateInterpreter;

impl FileInterpreter for TemplateInterpreter {
    fn supported_extensions(&self) -> &[&'static str] {
        &["latte", "html", "twig"]
    }

    fn map(&self, file: &Path, _parent: &LogicalPath, _basename: &str) -> Option<ParsedFrontmatter> {
        let content = match fs::read_to_string(file) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = %file.display(), error = %e, "Failed to read template");
                return None;
            }
        };
        let header = leading_comment(&content).unwrap_or("");
        Some(into_frontmatter(parse_mapping(header, file), true, false))
    }
}

/// Body of the comment opening the template, if any.
fn leading_comment(content: &str) -> Option<&str> {
    let content = content.trim_start_matches('\u{feff}').trim_start();
    COMMENTS.iter().find_map(|(open, close)| {
        let rest = content.strip_prefix(open)?;
        rest.find(close).map(|end| &rest[..end])
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_leading_comment_latte() {
        assert_eq!(
            leading_comment("{*\ntitle: A\n*}\n<p>x</p>"),
            Some("\ntitle: A\n")
        );
    }

    #[test]
    fn test_leading_comment_html() {
        assert_eq!(
            leading_comment("  <!-- title: B -->\n<p>x</p>"),
            Some(" title: B ")
        );
    }

    #[test]
    fn test_no_leading_comment() {
        assert_eq!(leading_comment("<p>{* not first *}</p>"), None);
        assert_eq!(leading_comment("{* unclosed"), None);
    }

    #[test]
    fn test_map_template() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("contact.latte");
        fs::write(&file, "{*\ntitle: Contact\ntags: [form]\n*}\n<form></form>").unwrap();

        let parsed = TemplateInterpreter
            .map(&file, &LogicalPath::root(), "contact")
            .unwrap();

        assert_eq!(parsed.title.as_deref(), Some("Contact"));
        assert_eq!(parsed.tags, vec!["form"]);
        assert!(parsed.routable);
    }

    #[test]
    fn test_map_template_without_header() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.html");
        fs::write(&file, "<p>plain</p>").unwrap();

        let parsed = TemplateInterpreter
            .map(&file, &LogicalPath::root(), "plain")
            .unwrap();

        assert_eq!(parsed.title, None);
        assert!(parsed.routable);
    }
}
