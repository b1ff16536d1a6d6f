//! `midy tree` command implementation.

use clap::Args;
use midy_storage::LogicalPath;
use midy_tree::Tree;

use super::CommonArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the tree command.
#[derive(Args)]
pub(crate) struct TreeArgs {
    /// Folder to start from.
    #[arg(default_value = "/")]
    path: String,

    /// Maximum folder depth to print.
    #[arg(long)]
    depth: Option<usize>,
}

impl TreeArgs {
    pub(crate) fn execute(self, common: &CommonArgs) -> Result<(), CliError> {
        let output = Output::new();
        let (tree, _) = common.open_tree()?;
        let start = LogicalPath::parse(&self.path)?;

        let folder = tree
            .folder(&start)?
            .ok_or_else(|| CliError::NotFound(format!("No folder at {start}")))?;
        output.line(&output.folder(&folder.title));
        print_level(&tree, &output, &start, 1, self.depth)
    }
}

fn print_level(
    tree: &Tree,
    output: &Output,
    logical: &LogicalPath,
    level: usize,
    max_depth: Option<usize>,
) -> Result<(), CliError> {
    if max_depth.is_some_and(|max| level > max) {
        return Ok(());
    }
    let indent = "  ".repeat(level);
    for folder in tree.subfolders(logical)? {
        let mut label = output.folder(&folder.title);
        if folder.record.is_virtual() {
            label.push_str(&output.dim(" (virtual)"));
        }
        output.line(&format!("{indent}{label}"));
        print_level(tree, output, folder.logical_path(), level + 1, max_depth)?;
    }
    for page in tree.children(logical)? {
        if !page.is_folder() {
            output.line(&format!("{indent}{}", page.title()));
        }
    }
    Ok(())
}
