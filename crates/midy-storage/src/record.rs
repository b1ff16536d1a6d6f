//! Records produced by the parser and stored in the cache.
//!
//! - [`ParsedFolder`]: one row per indexed directory
//! - [`ParsedFile`]: one physical file interpreted as a page variant
//! - [`PageRecord`]: all variants sharing a logical path, aggregated once
//!
//! # Aggregation Rules
//!
//! [`PageRecord::aggregate`] sorts variants by extension and then applies:
//!
//! - `title`, `summary`, `path_name`, `folder`: first variant
//! - `order`, `publish_date`, `last_modified_date`: maximum
//! - `hidden`: all variants hidden
//! - `routable`, `is_folder`: any variant
//! - `tags`: union in first-seen order
//! - `files`: extension → [`FileDescriptor`]

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::path::{LogicalPath, PhysicalPath};

/// Indexed directory.
///
/// The parent folder is derived from `logical_path` and never stored
/// separately, so a folder cannot disagree with its own parent link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedFolder {
    /// Logical path of the folder.
    pub logical_path: LogicalPath,
    /// Directory backing the folder (empty for virtual folders).
    pub physical_path: PhysicalPath,
    /// Modification time at last index, 0 for stubs that were never visited.
    pub mtime: f64,
    /// Whether descendant files are listed as direct children.
    pub flatten: bool,
    /// Display title.
    pub title: String,
}

impl ParsedFolder {
    /// Folder row written for a subdirectory before it is visited.
    #[must_use]
    pub fn stub(
        logical_path: LogicalPath,
        physical_path: PhysicalPath,
        flatten: bool,
        title: String,
    ) -> Self {
        Self {
            logical_path,
            physical_path,
            mtime: 0.0,
            flatten,
            title,
        }
    }

    /// Parent folder path, `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<LogicalPath> {
        self.logical_path.parent()
    }

    /// Check whether this folder has no physical directory.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.physical_path.is_virtual()
    }
}

/// One physical file interpreted as a page variant.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFile {
    /// Logical path of the page this file belongs to.
    pub logical_path: LogicalPath,
    /// Lower-cased file extension.
    pub ext: String,
    /// File location.
    pub physical_path: PhysicalPath,
    /// File modification time.
    pub mtime: f64,
    /// Sort key (already negated for descending folders).
    pub order: i64,
    /// Publish date (Unix seconds).
    pub publish_date: Option<i64>,
    /// Last modification date (Unix seconds).
    pub last_modified_date: Option<i64>,
    /// Whether the file can be dispatched to a handler.
    pub routable: bool,
    /// Basename after prefix stripping, e.g. `intro` for `01_intro.md`.
    pub path_name: String,
    /// Folder listing this page, `None` for the root index.
    pub folder: Option<LogicalPath>,
    /// Display title.
    pub title: String,
    /// Short description.
    pub summary: String,
    /// Tags.
    pub tags: Vec<String>,
    /// Slug override supplied by the interpreter.
    pub slug: Option<String>,
    /// Whether the file is hidden from listings.
    pub hidden: bool,
    /// Free-form interpreter data.
    pub other: serde_json::Map<String, serde_json::Value>,
    /// Whether this is an index file standing in for its folder.
    pub is_folder: bool,
}

impl ParsedFile {
    /// Minimal descriptor kept in the page row.
    #[must_use]
    pub fn descriptor(&self) -> FileDescriptor {
        FileDescriptor {
            physical_path: self.physical_path.clone(),
            ext: self.ext.clone(),
            mtime: self.mtime,
            other: self.other.clone(),
        }
    }
}

/// Minimal on-disk descriptor of one variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    /// File location.
    pub physical_path: PhysicalPath,
    /// Lower-cased extension.
    pub ext: String,
    /// Modification time at last index.
    pub mtime: f64,
    /// Free-form interpreter data.
    #[serde(default)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

impl FileDescriptor {
    /// Check whether the file changed or vanished since it was indexed.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.physical_path
            .mtime()
            .is_none_or(|live| live > self.mtime)
    }
}

/// Aggregated read model for one logical path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Logical path.
    pub logical_path: LogicalPath,
    /// Folder listing this page, `None` for the root index.
    pub folder: Option<LogicalPath>,
    /// Variants keyed by extension.
    pub files: BTreeMap<String, FileDescriptor>,
    /// Display title.
    pub title: String,
    /// Short description.
    pub summary: String,
    /// Sort key.
    pub order: i64,
    /// Hidden from listings (all variants hidden).
    pub hidden: bool,
    /// Dispatchable (any variant routable).
    pub routable: bool,
    /// Stands in for a folder (any variant is an index file).
    pub is_folder: bool,
    /// Latest publish date across variants.
    pub publish_date: Option<i64>,
    /// Latest modification date across variants.
    pub last_modified_date: Option<i64>,
    /// Basename after prefix stripping.
    pub path_name: String,
    /// Union of variant tags.
    pub tags: Vec<String>,
}

impl PageRecord {
    /// Aggregate variants sharing one logical path.
    ///
    /// Returns `None` for an empty variant set. Variants are sorted by
    /// extension so the result does not depend on directory listing order.
    #[must_use]
    pub fn aggregate(mut variants: Vec<ParsedFile>) -> Option<Self> {
        variants.sort_by(|a, b| a.ext.cmp(&b.ext));
        let first = variants.first()?;

        let mut seen = HashSet::new();
        let tags = variants
            .iter()
            .flat_map(|v| v.tags.iter())
            .filter(|tag| seen.insert(tag.as_str()))
            .cloned()
            .collect();

        Some(Self {
            logical_path: first.logical_path.clone(),
            folder: first.folder.clone(),
            files: variants
                .iter()
                .map(|v| (v.ext.clone(), v.descriptor()))
                .collect(),
            title: first.title.clone(),
            summary: first.summary.clone(),
            order: variants.iter().map(|v| v.order).max().unwrap_or_default(),
            hidden: variants.iter().all(|v| v.hidden),
            routable: variants.iter().any(|v| v.routable),
            is_folder: variants.iter().any(|v| v.is_folder),
            publish_date: variants.iter().filter_map(|v| v.publish_date).max(),
            last_modified_date: variants.iter().filter_map(|v| v.last_modified_date).max(),
            path_name: first.path_name.clone(),
            tags,
        })
    }

    /// First variant whose file changed or vanished since indexing.
    #[must_use]
    pub fn stale_variant(&self) -> Option<&FileDescriptor> {
        self.files.values().find(|f| f.is_stale())
    }
}
