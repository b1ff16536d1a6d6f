//! Cache error types.

/// Errors raised by the persistent index.
///
/// A missing record is never an error; lookups return `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// SQLite failure. Any open transaction has been rolled back.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON column could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Stored row violates the model (e.g. an invalid logical path).
    #[error("Corrupt row {path}: {message}")]
    Corrupt {
        /// Logical path of the offending row.
        path: String,
        /// What is wrong with it.
        message: String,
    },
}

impl CacheError {
    pub(crate) fn corrupt(path: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Corrupt {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupt_display() {
        let err = CacheError::corrupt("/a/../b", "relative path segment");
        assert_eq!(err.to_string(), "Corrupt row /a/../b: relative path segment");
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<Vec<String>>("not json").unwrap_err();
        let err = CacheError::from(json_err);
        assert!(matches!(err, CacheError::Serialize(_)));
    }
}
