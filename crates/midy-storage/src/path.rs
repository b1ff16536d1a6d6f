//! Logical and physical path types.
//!
//! A [`LogicalPath`] is the URL-shaped identity of a folder or page:
//!
//! - `/` - root
//! - `/blog` - folder or page
//! - `/blog/first-post` - nested page
//!
//! A [`PhysicalPath`] points at a real file or directory. The two never mix:
//! the parser derives logical paths from physical ones by dropping ordering
//! prefixes and extensions, and the tree maps logical paths back to physical
//! roots through its mount table.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Absolute, normalized, URL-shaped path.
///
/// Always starts with `/`, never ends with `/` (except the root), and never
/// contains empty, `.` or `..` segments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogicalPath(String);

impl LogicalPath {
    /// The root path `/`.
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_owned())
    }

    /// Parse and normalize a logical path.
    ///
    /// A missing leading slash and trailing slashes are tolerated:
    /// `"blog/"`, `"/blog"` and `"blog"` all parse to `/blog`; `""` parses
    /// to the root.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidPath` error for `.`/`..` segments, backslashes, or
    /// empty inner segments.
    pub fn parse(raw: &str) -> Result<Self, StorageError> {
        let trimmed = raw.trim().trim_end_matches('/');
        let inner = trimmed.strip_prefix('/').unwrap_or(trimmed);
        if inner.is_empty() {
            return Ok(Self::root());
        }
        if raw.contains('\\') {
            return Err(StorageError::invalid_path(raw, "backslash in logical path"));
        }

        let mut normalized = String::with_capacity(inner.len() + 1);
        for segment in inner.split('/') {
            match segment {
                "" => return Err(StorageError::invalid_path(raw, "empty path segment")),
                "." | ".." => {
                    return Err(StorageError::invalid_path(raw, "relative path segment"));
                }
                _ => {
                    normalized.push('/');
                    normalized.push_str(segment);
                }
            }
        }
        Ok(Self(normalized))
    }

    /// String form, e.g. `/blog/post`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether this is the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Parent path, `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.0.rsplit_once('/') {
            Some(("", _)) | None => Some(Self::root()),
            Some((parent, _)) => Some(Self(parent.to_owned())),
        }
    }

    /// Last segment, empty for the root.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.rsplit_once('/').map_or("", |(_, last)| last)
    }

    /// Segments from the root down, empty for the root.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Number of segments (root is 0).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Append one segment.
    ///
    /// The segment is taken verbatim; callers pass names that were already
    /// validated (file and directory names never contain `/`).
    #[must_use]
    pub fn join(&self, segment: &str) -> Self {
        let segment = segment.trim_matches('/');
        if segment.is_empty() {
            return self.clone();
        }
        if self.is_root() {
            Self(format!("/{segment}"))
        } else {
            Self(format!("{}/{segment}", self.0))
        }
    }

    /// Check whether `self` lies strictly below `ancestor`.
    #[must_use]
    pub fn is_descendant_of(&self, ancestor: &Self) -> bool {
        if self == ancestor {
            return false;
        }
        ancestor.is_root() || self.0.starts_with(&format!("{}/", ancestor.0))
    }

    /// Ancestors from the root down to the parent (excluding `self`).
    ///
    /// `/a/b/c` → `[/, /a, /a/b]`
    #[must_use]
    pub fn ancestors(&self) -> Vec<Self> {
        let mut chain = Vec::new();
        let mut current = self.parent();
        while let Some(path) = current {
            current = path.parent();
            chain.push(path);
        }
        chain.reverse();
        chain
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for LogicalPath {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LogicalPath> for String {
    fn from(path: LogicalPath) -> Self {
        path.0
    }
}

impl AsRef<str> for LogicalPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Location of a real file or directory.
///
/// An empty physical path marks a virtual folder: a logical ancestor of a
/// mount point that has no directory of its own.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhysicalPath(PathBuf);

impl PhysicalPath {
    /// Wrap a filesystem path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Placeholder for folders without physical backing.
    #[must_use]
    pub fn none() -> Self {
        Self(PathBuf::new())
    }

    /// Check whether this is the virtual placeholder.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.0.as_os_str().is_empty()
    }

    /// Borrow the underlying path.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Append a component.
    #[must_use]
    pub fn join(&self, name: impl AsRef<Path>) -> Self {
        Self(self.0.join(name))
    }

    /// Containing directory.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| Self(p.to_path_buf()))
    }

    /// Final component as UTF-8 (lossy).
    #[must_use]
    pub fn file_name(&self) -> Option<String> {
        self.0
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    }

    /// Lower-cased extension, empty when absent.
    #[must_use]
    pub fn extension(&self) -> String {
        self.0
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }

    /// Check whether the path exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        !self.is_virtual() && self.0.exists()
    }

    /// Check whether the path is an existing directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        !self.is_virtual() && self.0.is_dir()
    }

    /// Modification time as seconds since the Unix epoch.
    ///
    /// Returns `None` when the path is virtual, missing, or the platform
    /// does not report modification times.
    #[must_use]
    pub fn mtime(&self) -> Option<f64> {
        if self.is_virtual() {
            return None;
        }
        let modified = fs::metadata(&self.0).ok()?.modified().ok()?;
        modified
            .duration_since(UNIX_EPOCH)
            .ok()
            .map(|d| d.as_secs_f64())
    }
}

impl fmt::Display for PhysicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl From<PathBuf> for PhysicalPath {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

impl From<&Path> for PhysicalPath {
    fn from(path: &Path) -> Self {
        Self(path.to_path_buf())
    }
}

impl AsRef<Path> for PhysicalPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::StorageErrorKind;

    fn lp(raw: &str) -> LogicalPath {
        LogicalPath::parse(raw).unwrap()
    }

    #[test]
    fn test_parse_normalizes() {
        assert_eq!(lp("").as_str(), "/");
        assert_eq!(lp("/").as_str(), "/");
        assert_eq!(lp("blog").as_str(), "/blog");
        assert_eq!(lp("/blog/").as_str(), "/blog");
        assert_eq!(lp("/blog/post").as_str(), "/blog/post");
    }

    #[test]
    fn test_parse_rejects_relative_segments() {
        let err = LogicalPath::parse("/blog/../etc").unwrap_err();
        assert_eq!(err.kind(), StorageErrorKind::InvalidPath);

        assert!(LogicalPath::parse("/blog//post").is_err());
        assert!(LogicalPath::parse("C:\\blog").is_err());
    }

    #[test]
    fn test_parent_and_name() {
        assert_eq!(lp("/").parent(), None);
        assert_eq!(lp("/blog").parent(), Some(lp("/")));
        assert_eq!(lp("/blog/post").parent(), Some(lp("/blog")));
        assert_eq!(lp("/").name(), "");
        assert_eq!(lp("/blog/post").name(), "post");
    }

    #[test]
    fn test_join() {
        assert_eq!(lp("/").join("blog"), lp("/blog"));
        assert_eq!(lp("/blog").join("post"), lp("/blog/post"));
        assert_eq!(lp("/blog").join(""), lp("/blog"));
    }

    #[test]
    fn test_is_descendant_of() {
        assert!(lp("/blog/post").is_descendant_of(&lp("/blog")));
        assert!(lp("/blog").is_descendant_of(&lp("/")));
        assert!(!lp("/blog").is_descendant_of(&lp("/blog")));
        assert!(!lp("/blogger").is_descendant_of(&lp("/blog")));
    }

    #[test]
    fn test_ancestors() {
        assert_eq!(lp("/a/b/c").ancestors(), vec![lp("/"), lp("/a"), lp("/a/b")]);
        assert!(lp("/").ancestors().is_empty());
        assert_eq!(lp("/a/b/c").depth(), 3);
    }

    #[test]
    fn test_serde_roundtrip_validates() {
        let json = serde_json::to_string(&lp("/blog")).unwrap();
        assert_eq!(json, "\"/blog\"");
        assert!(serde_json::from_str::<LogicalPath>("\"/a/../b\"").is_err());
    }

    #[test]
    fn test_physical_path_parts() {
        let path = PhysicalPath::new("/content/01_intro.MD");
        assert_eq!(path.file_name().as_deref(), Some("01_intro.MD"));
        assert_eq!(path.extension(), "md");
        assert_eq!(path.parent(), Some(PhysicalPath::new("/content")));
    }

    #[test]
    fn test_virtual_physical_path() {
        let path = PhysicalPath::none();
        assert!(path.is_virtual());
        assert!(!path.exists());
        assert!(path.mtime().is_none());
    }

    #[test]
    fn test_physical_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.md");
        fs::write(&file, "# A").unwrap();

        let path = PhysicalPath::new(&file);
        assert!(path.exists());
        assert!(path.mtime().is_some());
        assert!(PhysicalPath::new(dir.path().join("missing")).mtime().is_none());
    }
}
