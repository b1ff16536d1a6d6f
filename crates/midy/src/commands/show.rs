//! `midy show` command implementation.

use clap::Args;
use midy_storage::PageRecord;
use midy_tree::Entry;

use super::{CommonArgs, format_timestamp};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the show command.
#[derive(Args)]
pub(crate) struct ShowArgs {
    /// Logical path of a page or folder.
    path: String,

    /// Print the resolved entry as JSON.
    #[arg(long)]
    json: bool,
}

impl ShowArgs {
    pub(crate) fn execute(self, common: &CommonArgs) -> Result<(), CliError> {
        let output = Output::new();
        let (tree, _) = common.open_tree()?;

        let entry = tree
            .lookup(&self.path)?
            .ok_or_else(|| CliError::NotFound(format!("No page or folder at {}", self.path)))?;

        if self.json {
            output.line(&serde_json::to_string_pretty(&entry)?);
            return Ok(());
        }

        let crumbs = tree.breadcrumbs(entry.logical_path())?;
        if !crumbs.is_empty() {
            let trail: Vec<&str> = crumbs.iter().map(|c| c.title.as_str()).collect();
            output.line(&output.dim(&trail.join(" / ")));
        }

        match &entry {
            Entry::Folder(folder) => {
                output.line(&output.folder(&folder.title));
                output.line(&format!("path      {}", folder.logical_path()));
                output.line(&format!("directory {}", folder.physical_path()));
                if folder.record.flatten {
                    output.line("flatten   yes");
                }
                if let Some(index) = &folder.index {
                    print_page(&output, index);
                }
                let children = tree.children(folder.logical_path())?;
                output.line(&format!("children  {}", children.len()));
            }
            Entry::Page(page) => {
                output.line(&page.title);
                output.line(&format!("path      {}", page.logical_path));
                print_page(&output, page);
            }
        }
        Ok(())
    }
}

fn print_page(output: &Output, page: &PageRecord) {
    if !page.summary.is_empty() {
        output.line(&format!("summary   {}", page.summary));
    }
    if !page.tags.is_empty() {
        output.line(&format!("tags      {}", page.tags.join(", ")));
    }
    if let Some(date) = page.publish_date {
        output.line(&format!("published {}", format_timestamp(date)));
    }
    if let Some(date) = page.last_modified_date {
        output.line(&format!("modified  {}", format_timestamp(date)));
    }
    let flags: Vec<&str> = [
        (page.hidden, "hidden"),
        (!page.routable, "not routable"),
    ]
    .into_iter()
    .filter_map(|(set, name)| set.then_some(name))
    .collect();
    if !flags.is_empty() {
        output.line(&format!("flags     {}", flags.join(", ")));
    }
    for file in page.files.values() {
        output.line(&format!("file      {}", file.physical_path));
    }
}
