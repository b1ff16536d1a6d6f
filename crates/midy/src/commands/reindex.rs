//! `midy reindex` command implementation.

use std::time::Instant;

use clap::Args;
use midy_storage::LogicalPath;

use super::CommonArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the reindex command.
#[derive(Args)]
pub(crate) struct ReindexArgs {
    /// Logical path of the subtree to reindex.
    #[arg(default_value = "/")]
    path: String,

    /// Drop the whole index before reindexing.
    #[arg(long)]
    clean: bool,
}

impl ReindexArgs {
    pub(crate) fn execute(self, common: &CommonArgs) -> Result<(), CliError> {
        let output = Output::new();
        let (tree, config) = common.open_tree()?;
        let root = LogicalPath::parse(&self.path)?;

        output.info(&format!(
            "Content: {}",
            config.tree_resolved.root.display()
        ));
        if self.clean {
            tree.reinitialize()?;
            output.info("Index cleared");
        }

        let started = Instant::now();
        let count = tree.reindex_all(&root)?;
        output.success(&format!(
            "Indexed {count} folder{} under {root} in {:.2?}",
            if count == 1 { "" } else { "s" },
            started.elapsed()
        ));
        Ok(())
    }
}
