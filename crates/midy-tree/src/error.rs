//! Error type for tree operations.

use midy_cache::CacheError;
use midy_storage::StorageError;

/// Error returned by [`Tree`](crate::Tree) operations.
///
/// A path that does not resolve is `Ok(None)`, never an error.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// Index read or write failed; a failed write was rolled back.
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// Invalid logical path.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
