//! Content tree facade for Midy.
//!
//! [`Tree`] maps logical paths to folders and pages, parsing directories on
//! demand and keeping the results in a persistent index. Cached rows are
//! compared against the filesystem on every read, so edits show up without an
//! explicit reindex.
//!
//! # Quick Start
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use midy_cache::{PageQuery, SqliteRepository};
//! use midy_storage::{LogicalPath, PhysicalPath};
//! use midy_storage_fs::default_registry;
//! use midy_tree::Tree;
//!
//! let repository = Arc::new(SqliteRepository::open(".midy/index.sqlite")?);
//! let mut tree = Tree::new(PhysicalPath::new("content"), repository, default_registry());
//! tree.mount(PhysicalPath::new("admin/pages"), LogicalPath::parse("/admin")?);
//!
//! let blog = PageQuery::new().folder(LogicalPath::parse("/blog")?);
//! let first = tree.query_pages(&blog, 1, 10)?;
//! for entry in &first.items {
//!     println!("{} {}", entry.logical_path(), entry.title());
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod folder;
mod pagination;
mod tree;

pub use error::TreeError;
pub use folder::{Breadcrumb, Entry, Folder};
pub use midy_storage::MountTable;
pub use pagination::Pagination;
pub use tree::Tree;
