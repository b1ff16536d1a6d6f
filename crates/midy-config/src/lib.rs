//! Configuration management for Midy.
//!
//! Parses `midy.toml` with serde and discovers it in the current directory or
//! its parents. CLI settings are applied last via [`CliSettings`].
//!
//! ```toml
//! [tree]
//! root = "content"
//! control_file = "folder.midy"
//! index_name = "index"
//!
//! [cache]
//! enabled = true
//! path = ".midy/index.sqlite"
//!
//! [[mounts]]
//! logical = "/admin"
//! physical = "${ADMIN_PAGES:-admin/pages}"
//! ```
//!
//! ## Environment Variable Expansion
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields: `tree.root`, `cache.path`, `mounts[].physical`.
//! Relative paths are resolved against the directory holding `midy.toml`.

mod expand;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "midy.toml";

const DEFAULT_ROOT: &str = "content";
const DEFAULT_CONTROL_FILE: &str = "folder.midy";
const DEFAULT_INDEX_NAME: &str = "index";
const DEFAULT_CACHE_PATH: &str = ".midy/index.sqlite";

/// CLI settings that override configuration file values.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the content root.
    pub root: Option<PathBuf>,
    /// Override the cache enabled flag.
    pub cache_enabled: Option<bool>,
    /// Override the cache database path.
    pub cache_path: Option<PathBuf>,
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    tree: TreeConfigRaw,
    cache: CacheConfigRaw,
    mounts: Vec<MountConfigRaw>,

    /// Resolved tree configuration (set after loading).
    #[serde(skip)]
    pub tree_resolved: TreeConfig,
    /// Resolved cache configuration (set after loading).
    #[serde(skip)]
    pub cache_resolved: CacheConfig,
    /// Resolved mounts (set after loading).
    #[serde(skip)]
    pub mounts_resolved: Vec<MountConfig>,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct TreeConfigRaw {
    root: Option<String>,
    control_file: Option<String>,
    index_name: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CacheConfigRaw {
    enabled: Option<bool>,
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MountConfigRaw {
    logical: String,
    physical: String,
}

/// Content tree settings with absolute paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeConfig {
    /// Directory mounted at `/`.
    pub root: PathBuf,
    /// Per-folder control file name.
    pub control_file: String,
    /// Reserved basename of index files.
    pub index_name: String,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            control_file: DEFAULT_CONTROL_FILE.to_owned(),
            index_name: DEFAULT_INDEX_NAME.to_owned(),
        }
    }
}

/// Index database settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Persist the index; when false an in-memory index is used.
    pub enabled: bool,
    /// SQLite database file.
    pub path: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from(DEFAULT_CACHE_PATH),
        }
    }
}

/// One extra directory grafted into the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountConfig {
    /// Logical path the directory appears at.
    pub logical: String,
    /// Directory to mount.
    pub physical: PathBuf,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`tree.root`").
        field: String,
        /// Error message (e.g., "${`CONTENT_DIR`} not set").
        message: String,
    },
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a plain file name: no separators, not `.` or `..`.
fn require_file_name(value: &str, field: &str) -> Result<(), ConfigError> {
    require_non_empty(value, field)?;
    if value.contains(['/', '\\']) || value == "." || value == ".." {
        return Err(ConfigError::Validation(format!(
            "{field} must be a file name, got {value:?}"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file. Otherwise searches
    /// for `midy.toml` in the current directory and its parents, falling back
    /// to defaults relative to the current directory.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or validation fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(root) = &settings.root {
            self.tree_resolved.root.clone_from(root);
        }
        if let Some(enabled) = settings.cache_enabled {
            self.cache_resolved.enabled = enabled;
        }
        if let Some(path) = &settings.cache_path {
            self.cache_resolved.path.clone_from(path);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    fn default_with_base(base: &Path) -> Self {
        Self {
            tree: TreeConfigRaw::default(),
            cache: CacheConfigRaw::default(),
            mounts: Vec::new(),
            tree_resolved: TreeConfig {
                root: base.join(DEFAULT_ROOT),
                ..TreeConfig::default()
            },
            cache_resolved: CacheConfig {
                enabled: true,
                path: base.join(DEFAULT_CACHE_PATH),
            },
            mounts_resolved: Vec::new(),
            config_path: None,
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_file_name(&self.tree_resolved.control_file, "tree.control_file")?;
        require_file_name(&self.tree_resolved.index_name, "tree.index_name")?;
        if self.tree_resolved.index_name.contains('.') {
            return Err(ConfigError::Validation(
                "tree.index_name must be a basename without extension".to_owned(),
            ));
        }
        self.validate_mounts()
    }

    fn validate_mounts(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (i, mount) in self.mounts_resolved.iter().enumerate() {
            let field = format!("mounts[{i}].logical");
            let logical = mount.logical.trim_end_matches('/');
            if !mount.logical.starts_with('/') {
                return Err(ConfigError::Validation(format!(
                    "{field} must start with '/'"
                )));
            }
            if logical.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "{field} cannot be '/'; set tree.root instead"
                )));
            }
            if logical
                .split('/')
                .skip(1)
                .any(|segment| segment.is_empty() || segment == "." || segment == "..")
            {
                return Err(ConfigError::Validation(format!(
                    "{field} has an empty or relative segment"
                )));
            }
            if !seen.insert(logical) {
                return Err(ConfigError::Validation(format!(
                    "{field} mounts {logical} twice"
                )));
            }
        }
        Ok(())
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(root) = &self.tree.root {
            self.tree.root = Some(expand::expand_path(root, "tree.root")?);
        }
        if let Some(path) = &self.cache.path {
            self.cache.path = Some(expand::expand_path(path, "cache.path")?);
        }
        for (i, mount) in self.mounts.iter_mut().enumerate() {
            mount.physical = expand::expand_path(&mount.physical, &format!("mounts[{i}].physical"))?;
        }
        Ok(())
    }

    /// Resolve relative paths against the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.tree_resolved = TreeConfig {
            root: resolve(self.tree.root.as_deref(), DEFAULT_ROOT),
            control_file: self
                .tree
                .control_file
                .clone()
                .unwrap_or_else(|| DEFAULT_CONTROL_FILE.to_owned()),
            index_name: self
                .tree
                .index_name
                .clone()
                .unwrap_or_else(|| DEFAULT_INDEX_NAME.to_owned()),
        };
        self.cache_resolved = CacheConfig {
            enabled: self.cache.enabled.unwrap_or(true),
            path: resolve(self.cache.path.as_deref(), DEFAULT_CACHE_PATH),
        };
        self.mounts_resolved = self
            .mounts
            .iter()
            .map(|mount| MountConfig {
                logical: mount.logical.clone(),
                physical: config_dir.join(&mount.physical),
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(toml: &str, base: &str) -> Config {
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new(base));
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/site"));
        assert_eq!(config.tree_resolved.root, PathBuf::from("/site/content"));
        assert_eq!(config.tree_resolved.control_file, "folder.midy");
        assert_eq!(config.tree_resolved.index_name, "index");
        assert!(config.cache_resolved.enabled);
        assert_eq!(
            config.cache_resolved.path,
            PathBuf::from("/site/.midy/index.sqlite")
        );
        assert!(config.mounts_resolved.is_empty());
    }

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config = parse("", "/site");
        assert_eq!(config.tree_resolved.root, PathBuf::from("/site/content"));
        assert!(config.cache_resolved.enabled);
        config.validate().unwrap();
    }

    #[test]
    fn test_resolve_paths() {
        let config = parse(
            r#"
[tree]
root = "pages"
control_file = "_folder.json"

[cache]
enabled = false
path = "/var/cache/midy.sqlite"

[[mounts]]
logical = "/admin"
physical = "../admin/pages"
"#,
            "/site",
        );

        assert_eq!(config.tree_resolved.root, PathBuf::from("/site/pages"));
        assert_eq!(config.tree_resolved.control_file, "_folder.json");
        assert!(!config.cache_resolved.enabled);
        assert_eq!(
            config.cache_resolved.path,
            PathBuf::from("/var/cache/midy.sqlite")
        );
        assert_eq!(
            config.mounts_resolved,
            vec![MountConfig {
                logical: "/admin".to_owned(),
                physical: PathBuf::from("/site/../admin/pages"),
            }]
        );
    }

    #[test]
    fn test_mount_must_be_absolute() {
        let config = parse(
            "[[mounts]]\nlogical = \"admin\"\nphysical = \"admin\"\n",
            "/site",
        );
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("mounts[0].logical"));
    }

    #[test]
    fn test_mount_at_root_rejected() {
        let config = parse("[[mounts]]\nlogical = \"/\"\nphysical = \"x\"\n", "/site");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_mount_rejected() {
        let config = parse(
            r#"
[[mounts]]
logical = "/admin"
physical = "a"

[[mounts]]
logical = "/admin/"
physical = "b"
"#,
            "/site",
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("twice"));
    }

    #[test]
    fn test_relative_mount_segment_rejected() {
        let config = parse(
            "[[mounts]]\nlogical = \"/a/../b\"\nphysical = \"x\"\n",
            "/site",
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_control_file_must_be_file_name() {
        let config = parse("[tree]\ncontrol_file = \"conf/folder.midy\"\n", "/site");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_index_name_without_extension() {
        let config = parse("[tree]\nindex_name = \"index.md\"\n", "/site");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default_with_base(Path::new("/site"));
        config.apply_cli_settings(&CliSettings {
            root: Some(PathBuf::from("/elsewhere")),
            cache_enabled: Some(false),
            ..Default::default()
        });

        assert_eq!(config.tree_resolved.root, PathBuf::from("/elsewhere"));
        assert!(!config.cache_resolved.enabled);
        assert_eq!(
            config.cache_resolved.path,
            PathBuf::from("/site/.midy/index.sqlite")
        );
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("midy.toml");
        std::fs::write(&path, "[tree]\nroot = \"docs\"\n").unwrap();

        let config = Config::load(Some(path.as_path()), None).unwrap();

        assert_eq!(config.tree_resolved.root, dir.path().join("docs"));
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Some(Path::new("/nonexistent/midy.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("midy.toml");
        std::fs::write(&path, "[tree\nroot = ").unwrap();

        let err = Config::load(Some(path.as_path()), None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_expands_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("midy.toml");
        std::fs::write(
            &path,
            "[[mounts]]\nlogical = \"/admin\"\nphysical = \"${MIDY_TEST_ADMIN_DIR:-admin}\"\n",
        )
        .unwrap();
        // SAFETY: variable name is unique to this test
        unsafe {
            std::env::remove_var("MIDY_TEST_ADMIN_DIR");
        }

        let config = Config::load(Some(path.as_path()), None).unwrap();

        assert_eq!(config.mounts_resolved[0].physical, dir.path().join("admin"));
    }
}
