//! `midy ls` command implementation.

use clap::Args;
use midy_cache::{Direction, OrderField, PageQuery, PublishedBefore};
use midy_storage::LogicalPath;
use midy_tree::Entry;

use super::CommonArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the ls command.
#[derive(Args)]
pub(crate) struct LsArgs {
    /// Folder to list.
    #[arg(default_value = "/")]
    path: String,

    /// 1-based page number.
    #[arg(long, default_value_t = 1)]
    page: usize,

    /// Entries per page.
    #[arg(long, default_value_t = 20)]
    page_size: usize,

    /// Include pages from every descendant folder.
    #[arg(long)]
    deep: bool,

    /// Keep only pages carrying one of these tags (repeatable).
    #[arg(long = "tag", value_name = "TAG")]
    tags: Vec<String>,

    /// Include hidden pages.
    #[arg(long)]
    all: bool,

    /// Include pages with a future publish date.
    #[arg(long)]
    drafts: bool,

    /// Sort key as `field[:asc|desc]` (repeatable).
    #[arg(long = "order", value_name = "FIELD[:DIR]", value_parser = parse_order)]
    order: Vec<(OrderField, Direction)>,

    /// Print the page of results as JSON.
    #[arg(long)]
    json: bool,
}

impl LsArgs {
    pub(crate) fn execute(self, common: &CommonArgs) -> Result<(), CliError> {
        let output = Output::new();
        let (tree, _) = common.open_tree()?;
        let folder = LogicalPath::parse(&self.path)?;

        let mut query = PageQuery::new()
            .folder(folder.clone())
            .deep(self.deep)
            .include_hidden(self.all)
            .any_tag(self.tags);
        if self.drafts {
            query = query.published_before(PublishedBefore::Disabled);
        }
        for (field, direction) in self.order {
            query = query.order_by(field, direction);
        }

        let page = tree.query_pages(&query, self.page, self.page_size)?;
        if self.json {
            output.line(&serde_json::to_string_pretty(&page)?);
            return Ok(());
        }

        if page.items.is_empty() {
            output.info(&format!("Nothing listed under {folder}"));
            return Ok(());
        }
        for entry in &page.items {
            let label = match entry {
                Entry::Folder(_) => output.folder(&format!("{}/", entry.title())),
                Entry::Page(_) => entry.title().to_owned(),
            };
            output.line(&format!("{label}  {}", output.dim(&entry.logical_path().to_string())));
        }
        if page.page_count > 1 {
            output.info(&format!(
                "Page {} of {} ({} total)",
                page.page_num, page.page_count, page.total
            ));
        }
        Ok(())
    }
}

/// Parse `field[:asc|desc]` into a sort key.
fn parse_order(raw: &str) -> Result<(OrderField, Direction), String> {
    let (field, direction) = raw.split_once(':').unwrap_or((raw, "asc"));
    let field = match field {
        "order" => OrderField::Order,
        "title" => OrderField::Title,
        "path" | "logicalPath" => OrderField::LogicalPath,
        "published" | "publishDate" => OrderField::PublishDate,
        "modified" | "lastModifiedDate" => OrderField::LastModifiedDate,
        "name" | "pathName" => OrderField::PathName,
        other => return Err(format!("unknown sort field '{other}'")),
    };
    let direction = match direction {
        "asc" => Direction::Asc,
        "desc" => Direction::Desc,
        other => return Err(format!("unknown sort direction '{other}'")),
    };
    Ok((field, direction))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_order_defaults_to_ascending() {
        assert_eq!(parse_order("title"), Ok((OrderField::Title, Direction::Asc)));
    }

    #[test]
    fn test_parse_order_with_direction() {
        assert_eq!(
            parse_order("published:desc"),
            Ok((OrderField::PublishDate, Direction::Desc))
        );
        assert_eq!(
            parse_order("pathName:asc"),
            Ok((OrderField::PathName, Direction::Asc))
        );
    }

    #[test]
    fn test_parse_order_rejects_unknown() {
        assert!(parse_order("size").is_err());
        assert!(parse_order("title:up").is_err());
    }
}
