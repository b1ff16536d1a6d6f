//! CLI command implementations.

mod ls;
mod reindex;
mod show;
mod tree;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use midy_cache::{Repository, SqliteRepository};
use midy_config::{CliSettings, Config};
use midy_storage::{LogicalPath, PhysicalPath};
use midy_storage_fs::default_registry;
use midy_tree::Tree;

use crate::error::CliError;

pub(crate) use ls::LsArgs;
pub(crate) use reindex::ReindexArgs;
pub(crate) use show::ShowArgs;
pub(crate) use tree::TreeArgs;

/// Options shared by every command.
#[derive(Args)]
pub(crate) struct CommonArgs {
    /// Path to configuration file (default: auto-discover midy.toml).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Content root directory (overrides config).
    #[arg(short, long, global = true, env = "MIDY_ROOT")]
    root: Option<PathBuf>,

    /// Index database file (overrides config).
    #[arg(long, global = true)]
    cache_path: Option<PathBuf>,

    /// Keep the index in memory only.
    #[arg(long, global = true)]
    no_cache: bool,

    /// Enable verbose output (reindex and cache logs).
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl CommonArgs {
    /// Load configuration and build the content tree it describes.
    pub(crate) fn open_tree(&self) -> Result<(Tree, Config), CliError> {
        let cli_settings = CliSettings {
            root: self.root.clone(),
            cache_enabled: self.no_cache.then_some(false),
            cache_path: self.cache_path.clone(),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let repository: Arc<dyn Repository> = if config.cache_resolved.enabled {
            let path = &config.cache_resolved.path;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            tracing::debug!(path = %path.display(), "Opening index");
            Arc::new(SqliteRepository::open(path)?)
        } else {
            Arc::new(SqliteRepository::in_memory()?)
        };

        let mut tree = Tree::new(
            PhysicalPath::new(&config.tree_resolved.root),
            repository,
            default_registry(),
        )
        .with_control_filename(&config.tree_resolved.control_file)
        .with_index_name(&config.tree_resolved.index_name);
        for mount in &config.mounts_resolved {
            tree.mount(
                PhysicalPath::new(&mount.physical),
                LogicalPath::parse(&mount.logical)?,
            );
        }

        Ok((tree, config))
    }
}

/// Format a Unix timestamp as a UTC date-time.
fn format_timestamp(seconds: i64) -> String {
    chrono::DateTime::from_timestamp(seconds, 0).map_or_else(
        || seconds.to_string(),
        |date| date.format("%Y-%m-%d %H:%M").to_string(),
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn common(config: PathBuf) -> CommonArgs {
        CommonArgs {
            config: Some(config),
            root: None,
            cache_path: None,
            no_cache: false,
            verbose: false,
        }
    }

    #[test]
    fn test_open_tree_with_mount_and_file_cache() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("content")).unwrap();
        std::fs::create_dir_all(dir.path().join("admin")).unwrap();
        std::fs::write(dir.path().join("content/about.md"), "# About\n").unwrap();
        std::fs::write(dir.path().join("admin/users.md"), "# Users\n").unwrap();
        let path = dir.path().join("midy.toml");
        std::fs::write(
            &path,
            "[[mounts]]\nlogical = \"/admin\"\nphysical = \"admin\"\n",
        )
        .unwrap();

        let (tree, config) = common(path).open_tree().unwrap();

        assert!(config.cache_resolved.path.parent().unwrap().is_dir());
        let about = tree.lookup("/about").unwrap().unwrap();
        assert_eq!(about.title(), "About");
        let users = tree.lookup("/admin/users").unwrap().unwrap();
        assert_eq!(users.title(), "Users");
    }

    #[test]
    fn test_open_tree_no_cache_keeps_index_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("content")).unwrap();
        let path = dir.path().join("midy.toml");
        std::fs::write(&path, "").unwrap();
        let mut args = common(path);
        args.no_cache = true;

        let (_, config) = args.open_tree().unwrap();

        assert!(!config.cache_resolved.enabled);
        assert!(!dir.path().join(".midy").exists());
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00");
        assert_eq!(format_timestamp(1_700_000_000), "2023-11-14 22:13");
    }
}
