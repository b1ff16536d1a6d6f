//! Page listing queries.
//!
//! [`PageQuery`] describes the only query shape the index supports: folder
//! scope, visibility, tags, publish date, ordering, pagination and an
//! exclusion list. It compiles to a parameterized `WHERE`/`ORDER BY` pair;
//! column names come from [`OrderField`] and never from caller strings.

use midy_storage::{LogicalPath, PageRecord};
use rusqlite::types::Value;

/// Publish-date filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PublishedBefore {
    /// Only pages published at or before the current time.
    #[default]
    Now,
    /// Only pages published at or before the given Unix timestamp.
    At(i64),
    /// No publish-date filtering.
    Disabled,
}

/// Sortable page fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    /// Ordering-prefix sort key.
    Order,
    /// Display title.
    Title,
    /// Logical path.
    LogicalPath,
    /// Publish date.
    PublishDate,
    /// Last modification date.
    LastModifiedDate,
    /// Basename after prefix stripping.
    PathName,
}

impl OrderField {
    fn column(self) -> &'static str {
        match self {
            Self::Order => "\"order\"",
            Self::Title => "title",
            Self::LogicalPath => "logicalPath",
            Self::PublishDate => "publishDate",
            Self::LastModifiedDate => "lastModifiedDate",
            Self::PathName => "pathName",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl Direction {
    fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Ordering applied after every caller-supplied ordering.
const TIE_BREAK: [OrderField; 3] = [OrderField::Order, OrderField::Title, OrderField::LogicalPath];

/// Parameterized page listing query.
///
/// # Example
///
/// ```
/// use midy_cache::{Direction, OrderField, PageQuery};
/// use midy_storage::LogicalPath;
///
/// let query = PageQuery::new()
///     .folder(LogicalPath::parse("/blog").unwrap())
///     .deep(true)
///     .any_tag(["rust"])
///     .order_by(OrderField::PublishDate, Direction::Desc)
///     .limit(10);
/// assert_eq!(query.limit, Some(10));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageQuery {
    /// Folder scope; `None` lists every page.
    pub folder: Option<LogicalPath>,
    /// Include pages of all descendant folders.
    pub deep: bool,
    /// Include hidden pages.
    pub include_hidden: bool,
    /// Only routable pages.
    pub routable_only: bool,
    /// Match pages carrying any of these tags.
    pub any_tag: Vec<String>,
    /// Publish-date filter.
    pub published_before: PublishedBefore,
    /// Caller ordering, applied before the tie-break.
    pub order_by: Vec<(OrderField, Direction)>,
    /// Maximum number of pages returned.
    pub limit: Option<usize>,
    /// Number of pages skipped.
    pub offset: usize,
    /// Logical paths removed from the result.
    pub exclude: Vec<LogicalPath>,
}

impl PageQuery {
    /// Query listing every visible, published page.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one folder.
    #[must_use]
    pub fn folder(mut self, folder: LogicalPath) -> Self {
        self.folder = Some(folder);
        self
    }

    /// Include descendant folders.
    #[must_use]
    pub fn deep(mut self, deep: bool) -> Self {
        self.deep = deep;
        self
    }

    /// Include hidden pages.
    #[must_use]
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Only routable pages.
    #[must_use]
    pub fn routable_only(mut self, routable: bool) -> Self {
        self.routable_only = routable;
        self
    }

    /// Match pages carrying any of `tags`.
    #[must_use]
    pub fn any_tag<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.any_tag = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the publish-date filter.
    #[must_use]
    pub fn published_before(mut self, filter: PublishedBefore) -> Self {
        self.published_before = filter;
        self
    }

    /// Append an ordering.
    #[must_use]
    pub fn order_by(mut self, field: OrderField, direction: Direction) -> Self {
        self.order_by.push((field, direction));
        self
    }

    /// Limit the number of returned pages.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first `offset` pages.
    #[must_use]
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Remove a logical path from the result.
    #[must_use]
    pub fn exclude(mut self, path: LogicalPath) -> Self {
        self.exclude.push(path);
        self
    }

    /// Compile the filters into a `WHERE` clause and its parameters.
    pub(crate) fn where_clause(&self, now: i64) -> (String, Vec<Value>) {
        let mut clauses = Vec::new();
        let mut params = Vec::new();

        if let Some(folder) = &self.folder {
            match (folder.is_root(), self.deep) {
                (true, true) => clauses.push("folder IS NOT NULL".to_owned()),
                (false, true) => {
                    // instr counts characters, so non-ASCII names match too.
                    clauses.push("(folder = ? OR instr(folder, ?) = 1)".to_owned());
                    params.push(Value::Text(folder.as_str().to_owned()));
                    params.push(Value::Text(format!("{folder}/")));
                }
                (_, false) => {
                    clauses.push("folder = ?".to_owned());
                    params.push(Value::Text(folder.as_str().to_owned()));
                }
            }
            clauses.push("logicalPath != ?".to_owned());
            params.push(Value::Text(folder.as_str().to_owned()));
        }

        if !self.include_hidden {
            clauses.push("hidden = 0".to_owned());
        }
        if self.routable_only {
            clauses.push("routable = 1".to_owned());
        }

        if !self.any_tag.is_empty() {
            clauses.push(format!(
                "EXISTS (SELECT 1 FROM json_each(page.tags) WHERE json_each.value IN ({}))",
                placeholders(self.any_tag.len())
            ));
            params.extend(self.any_tag.iter().cloned().map(Value::Text));
        }

        let cutoff = match self.published_before {
            PublishedBefore::Now => Some(now),
            PublishedBefore::At(ts) => Some(ts),
            PublishedBefore::Disabled => None,
        };
        if let Some(cutoff) = cutoff {
            clauses.push("(publishDate IS NULL OR publishDate <= ?)".to_owned());
            params.push(Value::Integer(cutoff));
        }

        if !self.exclude.is_empty() {
            clauses.push(format!(
                "logicalPath NOT IN ({})",
                placeholders(self.exclude.len())
            ));
            params.extend(
                self.exclude
                    .iter()
                    .map(|p| Value::Text(p.as_str().to_owned())),
            );
        }

        if clauses.is_empty() {
            (String::new(), params)
        } else {
            (format!(" WHERE {}", clauses.join(" AND ")), params)
        }
    }

    /// Compile the ordering, suffixed with the tie-break.
    pub(crate) fn order_clause(&self) -> String {
        let mut seen = Vec::new();
        let mut terms = Vec::new();
        let tie_break = TIE_BREAK.iter().map(|&field| (field, Direction::Asc));
        for (field, direction) in self.order_by.iter().copied().chain(tie_break) {
            if seen.contains(&field) {
                continue;
            }
            seen.push(field);
            terms.push(format!("{} {}", field.column(), direction.keyword()));
        }
        format!(" ORDER BY {}", terms.join(", "))
    }

    /// Compile `LIMIT`/`OFFSET`.
    pub(crate) fn limit_clause(&self) -> String {
        let limit = self.limit.map_or(-1, to_i64);
        format!(" LIMIT {limit} OFFSET {}", self.offset)
    }
}

/// Result of [`PageQuery`] execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Number of matching pages before `limit`/`offset`.
    pub total: usize,
    /// Matching pages within the requested window.
    pub pages: Vec<PageRecord>,
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
