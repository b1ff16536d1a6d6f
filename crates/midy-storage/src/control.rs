//! Per-folder control file.
//!
//! A directory may contain a small JSON document (by default `folder.midy`)
//! controlling how its children are listed:
//!
//! ```json
//! {"order": "desc", "flatten": false, "hidden": false}
//! ```
//!
//! Every field is optional. A missing or malformed file yields the defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Default control file name.
pub const DEFAULT_CONTROL_FILENAME: &str = "folder.midy";

/// Listing direction for a folder's children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending by ordering prefix.
    #[default]
    Asc,
    /// Descending by ordering prefix.
    Desc,
}

impl SortOrder {
    /// Apply the listing polarity to a sort key.
    ///
    /// Descending folders store negated keys so queries always sort ascending.
    #[must_use]
    pub fn apply(self, key: i64) -> i64 {
        match self {
            Self::Asc => key,
            Self::Desc => key.saturating_neg(),
        }
    }
}

/// Parsed control file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolderControl {
    /// Listing direction.
    pub order: SortOrder,
    /// List every descendant file as a direct child.
    pub flatten: bool,
    /// Hide the folder itself (its index record) from listings.
    pub hidden: bool,
}

impl FolderControl {
    /// Read the control file at `path`.
    ///
    /// Returns the defaults when the file is absent or cannot be parsed.
    #[must_use]
    pub fn read(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read control file, using defaults");
                return Self::default();
            }
        };
        Self::parse(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Malformed control file, using defaults");
            Self::default()
        })
    }

    /// Parse control file content. Blank content yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns the JSON error for malformed content.
    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(content)
    }
}
