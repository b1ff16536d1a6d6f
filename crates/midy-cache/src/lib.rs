//! Persistent index for the Midy content tree.
//!
//! The index stores one row per folder and one row per aggregated page,
//! keyed by logical path. It is derived data: every row can be regenerated
//! by reparsing the folder it belongs to.
//!
//! - [`Repository`]: point reads and writes, the batch [`FolderIndex`]
//!   write, and the [`PageQuery`] listing query
//! - [`SqliteRepository`]: SQLite implementation
//!
//! # Example
//!
//! ```
//! use midy_cache::{PageQuery, Repository, SqliteRepository};
//! use midy_storage::LogicalPath;
//!
//! let repo = SqliteRepository::in_memory().unwrap();
//! assert!(repo.read_folder(&LogicalPath::root()).unwrap().is_none());
//!
//! let result = repo.query_pages(&PageQuery::new()).unwrap();
//! assert_eq!(result.total, 0);
//! ```

mod error;
mod query;
mod schema;
mod sqlite;

use midy_storage::{LogicalPath, PageRecord, ParsedFolder};

pub use error::CacheError;
pub use query::{Direction, OrderField, PageQuery, PublishedBefore, QueryResult};
pub use sqlite::SqliteRepository;

/// Everything one folder parse produced, written in a single transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderIndex {
    /// The parsed folder row.
    pub folder: ParsedFolder,
    /// Stub rows for subdirectories (mtime 0 until first visited).
    pub subfolders: Vec<ParsedFolder>,
    /// Aggregated pages listed by this folder.
    pub pages: Vec<PageRecord>,
    /// Whether the folder's own index record belongs to this write.
    ///
    /// True for the root and mount roots. Any other folder's index record is
    /// listed by its parent and written by the parent's parse.
    pub owns_index: bool,
    /// Logical children kept untouched: mount roots and folders on the way
    /// to a mount.
    pub preserve: Vec<LogicalPath>,
}

/// Durable storage and query engine for folder and page rows.
///
/// Implementations must be safe to share between threads.
pub trait Repository: Send + Sync {
    /// Insert or update a folder row.
    ///
    /// Existing children are kept.
    fn write_folder(&self, folder: &ParsedFolder) -> Result<(), CacheError>;

    /// Read a folder row.
    fn read_folder(&self, path: &LogicalPath) -> Result<Option<ParsedFolder>, CacheError>;

    /// Delete a folder row with all descendant folders and their pages.
    ///
    /// The folder's own index record is removed too.
    fn delete_folder(&self, path: &LogicalPath) -> Result<(), CacheError>;

    /// Direct child folder rows, ordered by logical path.
    fn child_folders(&self, parent: &LogicalPath) -> Result<Vec<ParsedFolder>, CacheError>;

    /// Replace a page row (delete-then-insert by logical path).
    fn write_page(&self, page: &PageRecord) -> Result<(), CacheError>;

    /// Read a page row.
    fn read_page(&self, path: &LogicalPath) -> Result<Option<PageRecord>, CacheError>;

    /// Delete a page row.
    fn delete_page(&self, path: &LogicalPath) -> Result<(), CacheError>;

    /// Replace everything one folder owns in a single transaction.
    ///
    /// On error nothing is written.
    fn replace_folder(&self, index: &FolderIndex) -> Result<(), CacheError>;

    /// List pages matching `query`.
    fn query_pages(&self, query: &PageQuery) -> Result<QueryResult, CacheError>;

    /// Drop and recreate the schema.
    fn reinitialize(&self) -> Result<(), CacheError>;
}
