//! Read-side values returned by the tree.

use midy_storage::{LogicalPath, PageRecord, ParsedFolder, PhysicalPath};
use serde::Serialize;

/// A resolved folder with its index page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Folder {
    /// Folder row.
    pub record: ParsedFolder,
    /// Aggregated index page, if the folder has an index file.
    pub index: Option<PageRecord>,
    /// Index title, else the folder row title.
    pub title: String,
}

impl Folder {
    /// Build a folder from its row and optional index page.
    #[must_use]
    pub fn new(record: ParsedFolder, index: Option<PageRecord>) -> Self {
        let title = index
            .as_ref()
            .map_or_else(|| record.title.clone(), |page| page.title.clone());
        Self {
            record,
            index,
            title,
        }
    }

    #[must_use]
    pub fn logical_path(&self) -> &LogicalPath {
        &self.record.logical_path
    }

    #[must_use]
    pub fn physical_path(&self) -> &PhysicalPath {
        &self.record.physical_path
    }
}

/// One item of a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Entry {
    /// Subfolder, listed through its index record.
    Folder(Folder),
    /// Plain page.
    Page(PageRecord),
}

impl Entry {
    #[must_use]
    pub fn logical_path(&self) -> &LogicalPath {
        match self {
            Self::Folder(folder) => folder.logical_path(),
            Self::Page(page) => &page.logical_path,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Folder(folder) => &folder.title,
            Self::Page(page) => &page.title,
        }
    }

    #[must_use]
    pub fn is_folder(&self) -> bool {
        matches!(self, Self::Folder(_))
    }
}

/// Breadcrumb navigation item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    /// Display title.
    pub title: String,
    /// Logical path of the ancestor.
    pub path: LogicalPath,
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn row(path: &str) -> ParsedFolder {
        ParsedFolder::stub(
            LogicalPath::parse(path).unwrap(),
            PhysicalPath::new(format!("/content{path}")),
            false,
            "Row Title".to_owned(),
        )
    }

    fn index(path: &str, title: &str) -> PageRecord {
        PageRecord {
            logical_path: LogicalPath::parse(path).unwrap(),
            folder: Some(LogicalPath::root()),
            files: BTreeMap::new(),
            title: title.to_owned(),
            summary: String::new(),
            order: 0,
            hidden: false,
            routable: true,
            is_folder: true,
            publish_date: None,
            last_modified_date: None,
            path_name: "guides".to_owned(),
            tags: Vec::new(),
        }
    }

    #[test]
    fn test_folder_title_prefers_index() {
        let folder = Folder::new(row("/guides"), Some(index("/guides", "User Guides")));
        assert_eq!(folder.title, "User Guides");
    }

    #[test]
    fn test_folder_title_falls_back_to_row() {
        let folder = Folder::new(row("/guides"), None);
        assert_eq!(folder.title, "Row Title");
    }

    #[test]
    fn test_entry_serializes_with_kind() {
        let entry = Entry::Page(index("/guides", "Guides"));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["kind"], "page");
        assert_eq!(json["logical_path"], "/guides");
    }
}
