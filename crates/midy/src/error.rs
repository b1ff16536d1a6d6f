//! CLI error types.

use midy_cache::CacheError;
use midy_config::ConfigError;
use midy_storage::StorageError;
use midy_tree::TreeError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Cache(#[from] CacheError),

    #[error("{0}")]
    Tree(#[from] TreeError),

    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    NotFound(String),
}
