//! Content model for the Midy content tree.
//!
//! This crate holds the types shared by the parser, the cache and the tree
//! facade:
//!
//! - **Paths**: [`LogicalPath`] (URL-shaped identity) and [`PhysicalPath`]
//!   (real file or directory)
//! - **Records**: [`ParsedFolder`], [`ParsedFile`] and the aggregated
//!   [`PageRecord`]
//! - **Folder control**: [`FolderControl`] read from `folder.midy`
//! - **Mounts**: [`MountTable`] binding logical roots to physical directories
//! - **Interpreters**: the [`FileInterpreter`] contract and the
//!   [`InterpreterRegistry`] dispatching files by extension
//!
//! # Example
//!
//! ```
//! use midy_storage::{LogicalPath, PageRecord};
//!
//! let path = LogicalPath::parse("blog/first-post/").unwrap();
//! assert_eq!(path.as_str(), "/blog/first-post");
//! assert_eq!(path.parent().unwrap().as_str(), "/blog");
//!
//! assert!(PageRecord::aggregate(Vec::new()).is_none());
//! ```

mod control;
mod error;
mod interpreter;
mod mount;
mod path;
mod record;
mod title;

pub use control::{DEFAULT_CONTROL_FILENAME, FolderControl, SortOrder};
pub use error::{StorageError, StorageErrorKind};
pub use interpreter::{FileInterpreter, InterpreterRegistry, ParsedFrontmatter};
pub use mount::MountTable;
pub use path::{LogicalPath, PhysicalPath};
pub use record::{FileDescriptor, PageRecord, ParsedFile, ParsedFolder};
pub use title::{title_from_name, titlecase_from_slug};

/// Reserved basename of index files.
pub const INDEX_NAME: &str = "index";
