//! File interpreter contract and registry.
//!
//! A [`FileInterpreter`] turns one file into [`ParsedFrontmatter`]. The
//! [`InterpreterRegistry`] multiplexes interpreters by file extension and is
//! the only entry point the parser uses.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::path::LogicalPath;

/// Structured frontmatter extracted from one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFrontmatter {
    /// Display title (the parser derives one from the basename when `None`).
    pub title: Option<String>,
    /// Short description.
    pub summary: String,
    /// Tags.
    pub tags: Vec<String>,
    /// Replaces the basename in the page's logical path.
    pub slug: Option<String>,
    /// Hidden from listings.
    pub hidden: bool,
    /// Dispatchable to a handler.
    pub routable: bool,
    /// Publish date (Unix seconds).
    pub publish_date: Option<i64>,
    /// Last modification date (Unix seconds).
    pub last_modified_date: Option<i64>,
    /// Free-form data.
    pub other: serde_json::Map<String, serde_json::Value>,
}

/// Maps a file of a given type to frontmatter.
pub trait FileInterpreter: Send + Sync {
    /// Lower-cased extensions handled by this interpreter (without the dot).
    fn supported_extensions(&self) -> &[&'static str];

    /// Interpret a file.
    ///
    /// # Arguments
    ///
    /// * `file` - Path of the file
    /// * `parent` - Logical path of the folder listing the file
    /// * `basename` - File name with ordering prefix and extension removed
    ///
    /// Returns `None` when the file is not supported (wrong type, unreadable).
    /// Unsupported files are skipped by the parser, never treated as errors.
    fn map(&self, file: &Path, parent: &LogicalPath, basename: &str)
    -> Option<ParsedFrontmatter>;
}

/// Dispatches files to interpreters by extension.
#[derive(Clone, Default)]
pub struct InterpreterRegistry {
    by_extension: HashMap<&'static str, Arc<dyn FileInterpreter>>,
}

impl InterpreterRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an interpreter for all of its extensions.
    ///
    /// A later registration replaces an earlier one for the same extension.
    #[must_use]
    pub fn with(mut self, interpreter: impl FileInterpreter + 'static) -> Self {
        self.register(Arc::new(interpreter));
        self
    }

    /// Register a shared interpreter for all of its extensions.
    pub fn register(&mut self, interpreter: Arc<dyn FileInterpreter>) {
        for &ext in interpreter.supported_extensions() {
            self.by_extension.insert(ext, Arc::clone(&interpreter));
        }
    }

    /// Check whether an extension has an interpreter.
    #[must_use]
    pub fn supports(&self, ext: &str) -> bool {
        self.by_extension.contains_key(ext.to_lowercase().as_str())
    }

    /// Extensions with a registered interpreter, sorted.
    #[must_use]
    pub fn extensions(&self) -> Vec<&'static str> {
        let mut extensions: Vec<_> = self.by_extension.keys().copied().collect();
        extensions.sort_unstable();
        extensions
    }

    /// Interpret a file with the interpreter registered for its extension.
    ///
    /// Returns `None` when no interpreter handles the extension or the
    /// interpreter declines the file.
    #[must_use]
    pub fn map(
        &self,
        file: &Path,
        parent: &LogicalPath,
        basename: &str,
    ) -> Option<ParsedFrontmatter> {
        let ext = file.extension()?.to_string_lossy().to_lowercase();
        let interpreter = self.by_extension.get(ext.as_str())?;
        interpreter.map(file, parent, basename)
    }
}

impl std::fmt::Debug for InterpreterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterpreterRegistry")
            .field("extensions", &self.extensions())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static [&'static str], &'static str);

    impl FileInterpreter for Fixed {
        fn supported_extensions(&self) -> &[&'static str] {
            self.0
        }

        fn map(&self, _file: &Path, _parent: &LogicalPath, basename: &str) -> Option<ParsedFrontmatter> {
            Some(ParsedFrontmatter {
                title: Some(format!("{}:{basename}", self.1)),
                ..Default::default()
            })
        }
    }

    struct Declines;

    impl FileInterpreter for Declines {
        fn supported_extensions(&self) -> &[&'static str] {
            &["bin"]
        }

        fn map(&self, _: &Path, _: &LogicalPath, _: &str) -> Option<ParsedFrontmatter> {
            None
        }
    }

    #[test]
    fn test_dispatch_by_extension() {
        let registry = InterpreterRegistry::new()
            .with(Fixed(&["md"], "markdown"))
            .with(Fixed(&["latte", "html"], "template"));

        let parent = LogicalPath::root();
        let md = registry.map(Path::new("/c/a.md"), &parent, "a").unwrap();
        let html = registry.map(Path::new("/c/a.HTML"), &parent, "a").unwrap();

        assert_eq!(md.title.as_deref(), Some("markdown:a"));
        assert_eq!(html.title.as_deref(), Some("template:a"));
    }

    #[test]
    fn test_unknown_extension_not_supported() {
        let registry = InterpreterRegistry::new().with(Fixed(&["md"], "markdown"));

        assert!(registry.map(Path::new("/c/a.xyz"), &LogicalPath::root(), "a").is_none());
        assert!(registry.map(Path::new("/c/noext"), &LogicalPath::root(), "noext").is_none());
        assert!(!registry.supports("xyz"));
        assert!(registry.supports("MD"));
    }

    #[test]
    fn test_interpreter_may_decline() {
        let registry = InterpreterRegistry::new().with(Declines);

        assert!(registry.map(Path::new("/c/a.bin"), &LogicalPath::root(), "a").is_none());
    }

    #[test]
    fn test_later_registration_wins() {
        let registry = InterpreterRegistry::new()
            .with(Fixed(&["md"], "first"))
            .with(Fixed(&["md"], "second"));

        let parsed = registry.map(Path::new("a.md"), &LogicalPath::root(), "a").unwrap();
        assert_eq!(parsed.title.as_deref(), Some("second:a"));
        assert_eq!(registry.extensions(), vec!["md"]);
    }
}
