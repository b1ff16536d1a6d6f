//! Static assets: routable, never listed.

use std::path::Path;

use midy_storage::{FileInterpreter, LogicalPath, ParsedFrontmatter};

/// Interpreter for static files served as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssetInterpreter;

impl FileInterpreter for AssetInterpreter {
    fn supported_extensions(&self) -> &[&'static str] {
        &[
            "css", "js", "json", "xml", "txt", "pdf", "png", "jpg", "jpeg", "gif", "svg", "webp",
            "ico", "woff", "woff2", "ttf",
        ]
    }

    fn map(&self, file: &Path, _parent: &LogicalPath, basename: &str) -> Option<ParsedFrontmatter> {
        if !file.is_file() {
            return None;
        }
        Some(ParsedFrontmatter {
            title: Some(basename.to_owned()),
            hidden: true,
            routable: true,
            ..ParsedFrontmatter::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_asset_is_hidden_and_routable() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("logo.svg");
        fs::write(&file, "<svg/>").unwrap();

        let parsed = AssetInterpreter
            .map(&file, &LogicalPath::root(), "logo")
            .unwrap();

        assert_eq!(parsed.title.as_deref(), Some("logo"));
        assert!(parsed.hidden);
        assert!(parsed.routable);
    }

    #[test]
    fn test_missing_asset_not_supported() {
        let dir = tempfile::tempdir().unwrap();
        assert!(
            AssetInterpreter
                .map(&dir.path().join("gone.css"), &LogicalPath::root(), "gone")
                .is_none()
        );
    }
}
