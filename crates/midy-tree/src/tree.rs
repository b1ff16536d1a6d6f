//! Lazily indexed content tree.
//!
//! Every read checks the cached folder row against the live filesystem:
//!
//! - **Fresh**: stored mtime is not behind the directory, return the row
//! - **Stale**: reparse the folder, then re-read
//! - **Missing mount root**: parse the mount's physical root
//! - **Missing folder**: resolve the parent first, then parse the directory
//!   the parent's listing recorded for it
//!
//! Pages are checked once more per variant file, since editing a file in place
//! does not touch its directory's mtime.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use midy_cache::{FolderIndex, PageQuery, Repository};
use midy_storage::{
    InterpreterRegistry, LogicalPath, MountTable, PageRecord, ParsedFolder, PhysicalPath,
    title_from_name,
};
use midy_storage_fs::Parser;

use crate::error::TreeError;
use crate::folder::{Breadcrumb, Entry, Folder};
use crate::pagination::Pagination;

/// What a caller waiting on the reindex lock re-checks before parsing.
#[derive(Clone, Copy)]
enum Recheck<'a> {
    /// Folder row is fresh again.
    Folder,
    /// No variant of this page is stale any more.
    Page(&'a LogicalPath),
    /// Always parse.
    Never,
}

/// Content tree over one or more mounted directories.
///
/// Safe to share between threads. Reindexing is serialized; a caller that
/// waited for another caller's reindex re-checks freshness and skips the
/// duplicate parse.
pub struct Tree {
    mounts: MountTable,
    repository: Arc<dyn Repository>,
    parser: Parser,
    reindex_lock: Mutex<()>,
}

impl Tree {
    /// Create a tree with `root` mounted at `/`.
    ///
    /// # Arguments
    ///
    /// * `root` - Primary content directory
    /// * `repository` - Index storage
    /// * `registry` - File interpreters by extension
    #[must_use]
    pub fn new(
        root: PhysicalPath,
        repository: Arc<dyn Repository>,
        registry: InterpreterRegistry,
    ) -> Self {
        Self {
            mounts: MountTable::new(root),
            parser: Parser::new(Arc::clone(&repository), registry),
            repository,
            reindex_lock: Mutex::new(()),
        }
    }

    /// Use a different control file name.
    #[must_use]
    pub fn with_control_filename(mut self, name: impl Into<String>) -> Self {
        self.parser = self.parser.with_control_filename(name);
        self
    }

    /// Use a different index basename.
    #[must_use]
    pub fn with_index_name(mut self, name: impl Into<String>) -> Self {
        self.parser = self.parser.with_index_name(name);
        self
    }

    /// Graft `physical` into the tree at `logical`.
    ///
    /// Returns the previous binding. The directory is not read until the
    /// mount is first resolved.
    pub fn mount(&mut self, physical: PhysicalPath, logical: LogicalPath) -> Option<PhysicalPath> {
        tracing::debug!(logical = %logical, physical = %physical, "Mounting directory");
        self.mounts.mount(logical, physical)
    }

    /// Current mount table.
    #[must_use]
    pub fn mounts(&self) -> &MountTable {
        &self.mounts
    }

    /// Index storage.
    #[must_use]
    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.repository
    }

    /// Drop every cached row.
    ///
    /// The next read reparses from scratch.
    pub fn reinitialize(&self) -> Result<(), TreeError> {
        let _guard = self.lock();
        self.repository.reinitialize()?;
        Ok(())
    }

    /// Resolve a folder with its index page.
    pub fn folder(&self, logical: &LogicalPath) -> Result<Option<Folder>, TreeError> {
        if self.resolve(logical)?.is_none() {
            return Ok(None);
        }
        let index = self.page(logical)?;
        // The index check may have reparsed this folder.
        let Some(record) = self.repository.read_folder(logical)? else {
            return Ok(None);
        };
        Ok(Some(Folder::new(record, index)))
    }

    /// Resolve a page.
    ///
    /// Loads the folder listing the page first, then reparses that folder if
    /// any variant file changed or vanished since it was indexed.
    pub fn page(&self, logical: &LogicalPath) -> Result<Option<PageRecord>, TreeError> {
        let owner = self.owner_of(logical);
        if self.resolve(&owner)?.is_none() {
            return Ok(None);
        }
        let Some(page) = self.repository.read_page(logical)? else {
            return Ok(None);
        };
        let Some(stale) = page.stale_variant() else {
            return Ok(Some(page));
        };

        tracing::debug!(
            page = %logical,
            file = %stale.physical_path,
            "Page variant changed, reindexing"
        );
        let owner = if self.mounts.is_mount_root(logical) {
            owner
        } else {
            page.folder.unwrap_or(owner)
        };
        self.reindex(&owner, Recheck::Page(logical))?;
        Ok(self.repository.read_page(logical)?)
    }

    /// Resolve a raw path to a folder or a page.
    ///
    /// Index pages resolve to their folder.
    pub fn lookup(&self, raw: &str) -> Result<Option<Entry>, TreeError> {
        let logical = LogicalPath::parse(raw)?;
        if let Some(page) = self.page(&logical)? {
            if page.is_folder
                && let Some(record) = self.resolve(&logical)?
            {
                return Ok(Some(Entry::Folder(Folder::new(record, Some(page)))));
            }
            return Ok(Some(Entry::Page(page)));
        }
        Ok(self
            .resolve(&logical)?
            .map(|record| Entry::Folder(Folder::new(record, None))))
    }

    /// Run a listing query and return one page of results.
    ///
    /// The queried folder is resolved first; deep and unscoped queries
    /// resolve the whole subtree. `query.limit` and `query.offset` are
    /// replaced by the pagination window.
    ///
    /// # Arguments
    ///
    /// * `query` - Listing filters and ordering
    /// * `page_num` - 1-based page number (0 is treated as 1)
    /// * `page_size` - Entries per page (0 is treated as 1)
    pub fn query_pages(
        &self,
        query: &PageQuery,
        page_num: usize,
        page_size: usize,
    ) -> Result<Pagination, TreeError> {
        match &query.folder {
            Some(folder) if !query.deep => {
                self.resolve(folder)?;
            }
            Some(folder) => self.resolve_subtree(folder)?,
            None => self.resolve_subtree(&LogicalPath::root())?,
        }

        let (page_num, page_size) = Pagination::normalize(page_num, page_size);
        let window = query
            .clone()
            .limit(page_size)
            .offset(Pagination::offset(page_num, page_size));
        let result = self.repository.query_pages(&window)?;
        let items = self.entries(result.pages)?;
        Ok(Pagination::new(result.total, page_num, page_size, items))
    }

    /// Visible children of a folder in display order.
    ///
    /// Returns an empty list when the folder does not resolve.
    pub fn children(&self, logical: &LogicalPath) -> Result<Vec<Entry>, TreeError> {
        if self.resolve(logical)?.is_none() {
            return Ok(Vec::new());
        }
        let result = self
            .repository
            .query_pages(&PageQuery::new().folder(logical.clone()))?;
        self.entries(result.pages)
    }

    /// Every child folder of a folder, with or without an index page.
    pub fn subfolders(&self, logical: &LogicalPath) -> Result<Vec<Folder>, TreeError> {
        if self.resolve(logical)?.is_none() {
            return Ok(Vec::new());
        }
        for child in self.mounts.preserved_under(logical) {
            self.resolve(&child)?;
        }
        self.repository
            .child_folders(logical)?
            .into_iter()
            .map(|record| {
                let index = self.repository.read_page(&record.logical_path)?;
                Ok(Folder::new(record, index))
            })
            .collect()
    }

    /// Ancestors of `logical` from the root down, excluding `logical`.
    pub fn breadcrumbs(&self, logical: &LogicalPath) -> Result<Vec<Breadcrumb>, TreeError> {
        let mut crumbs = Vec::new();
        for ancestor in logical.ancestors() {
            let title = match self.folder(&ancestor)? {
                Some(folder) => folder.title,
                None => title_from_name(ancestor.name()),
            };
            crumbs.push(Breadcrumb {
                title,
                path: ancestor,
            });
        }
        Ok(crumbs)
    }

    /// Reparse every folder below `root`, ignoring freshness.
    ///
    /// Returns the number of folders parsed from a physical directory.
    pub fn reindex_all(&self, root: &LogicalPath) -> Result<usize, TreeError> {
        let mut count = 0;
        let mut pending = vec![root.clone()];
        while let Some(logical) = pending.pop() {
            let Some(row) = self.reindex(&logical, Recheck::Never)? else {
                continue;
            };
            if !row.is_virtual() {
                count += 1;
            }
            let children: BTreeSet<LogicalPath> = self
                .repository
                .child_folders(&logical)?
                .into_iter()
                .map(|child| child.logical_path)
                .chain(self.mounts.preserved_under(&logical))
                .collect();
            pending.extend(children.into_iter().rev());
        }
        tracing::info!(root = %root, folders = count, "Reindexed subtree");
        Ok(count)
    }

    /// Folder row for `logical`, reindexed if stale or missing.
    fn resolve(&self, logical: &LogicalPath) -> Result<Option<ParsedFolder>, TreeError> {
        if let Some(row) = self.repository.read_folder(logical)?
            && self.is_fresh(&row)
        {
            return Ok(Some(row));
        }
        let row = self.reindex(logical, Recheck::Folder)?;
        if row.is_some() && self.mounts.is_mount_root(logical) {
            for (child, _) in self.mounts.children_of(logical) {
                self.resolve(child)?;
            }
        }
        Ok(row)
    }

    fn resolve_subtree(&self, logical: &LogicalPath) -> Result<(), TreeError> {
        if self.resolve(logical)?.is_none() {
            return Ok(());
        }
        let children: BTreeSet<LogicalPath> = self
            .repository
            .child_folders(logical)?
            .into_iter()
            .map(|child| child.logical_path)
            .chain(self.mounts.preserved_under(logical))
            .collect();
        for child in &children {
            self.resolve_subtree(child)?;
        }
        Ok(())
    }

    fn is_fresh(&self, row: &ParsedFolder) -> bool {
        if let Some(mounted) = self.mounts.get(&row.logical_path)
            && *mounted != row.physical_path
        {
            return false;
        }
        if row.is_virtual() {
            return true;
        }
        // Rows cached under an earlier binding of their mount.
        let (_, mount_root) = self.mounts.mount_for(&row.logical_path);
        if !row.physical_path.as_path().starts_with(mount_root.as_path()) {
            return false;
        }
        self.parser
            .folder_mtime(&row.physical_path)
            .is_some_and(|live| row.mtime >= live)
    }

    /// Parse `logical` from wherever it lives now.
    fn reindex(
        &self,
        logical: &LogicalPath,
        recheck: Recheck<'_>,
    ) -> Result<Option<ParsedFolder>, TreeError> {
        let Some(physical) = self.locate(logical)? else {
            return self.vanish(logical);
        };

        let _guard = self.lock();
        if self.is_current(logical, &physical, recheck)? {
            tracing::debug!(folder = %logical, "Folder already reindexed");
            return Ok(self.repository.read_folder(logical)?);
        }
        if !self.parser.parse_folder(&physical, logical, &self.mounts)? {
            return self.vanish(logical);
        }
        Ok(self.repository.read_folder(logical)?)
    }

    /// Physical directory currently backing `logical`.
    fn locate(&self, logical: &LogicalPath) -> Result<Option<PhysicalPath>, TreeError> {
        if let Some(physical) = self.mounts.get(logical) {
            // Gives the mount real ancestors where they exist.
            if let Some(parent) = logical.parent()
                && self.repository.read_folder(&parent)?.is_none()
            {
                self.resolve(&parent)?;
            }
            return Ok(Some(physical.clone()));
        }

        let Some(parent) = logical.parent() else {
            return Ok(None);
        };
        let Some(parent_row) = self.resolve(&parent)? else {
            return Ok(None);
        };
        // The parent's listing knows the prefixed directory name.
        if let Some(row) = self.repository.read_folder(logical)?
            && !row.is_virtual()
        {
            return Ok(Some(row.physical_path));
        }
        if parent_row.is_virtual() || parent_row.flatten {
            return Ok(None);
        }
        Ok(Some(parent_row.physical_path.join(logical.name())))
    }

    fn is_current(
        &self,
        logical: &LogicalPath,
        physical: &PhysicalPath,
        recheck: Recheck<'_>,
    ) -> Result<bool, TreeError> {
        Ok(match recheck {
            Recheck::Never => false,
            Recheck::Folder => self
                .repository
                .read_folder(logical)?
                .is_some_and(|row| row.physical_path == *physical && self.is_fresh(&row)),
            Recheck::Page(page) => self
                .repository
                .read_page(page)?
                .is_some_and(|record| record.stale_variant().is_none()),
        })
    }

    /// Drop the rows of a folder whose directory is gone.
    ///
    /// A folder on the way to a mount becomes virtual instead, so the mount
    /// stays reachable.
    fn vanish(&self, logical: &LogicalPath) -> Result<Option<ParsedFolder>, TreeError> {
        let leads_to_mount = self
            .mounts
            .iter()
            .any(|(root, _)| root.is_descendant_of(logical));
        if leads_to_mount {
            let folder = ParsedFolder::stub(
                logical.clone(),
                PhysicalPath::none(),
                false,
                title_from_name(logical.name()),
            );
            self.repository.replace_folder(&FolderIndex {
                folder,
                subfolders: Vec::new(),
                pages: Vec::new(),
                owns_index: self.mounts.is_mount_root(logical),
                preserve: self.mounts.preserved_under(logical),
            })?;
            return Ok(self.repository.read_folder(logical)?);
        }

        if self.repository.read_folder(logical)?.is_some() {
            tracing::debug!(folder = %logical, "Folder directory gone, dropping rows");
            self.repository.delete_folder(logical)?;
        }
        Ok(None)
    }

    /// Folder whose parse writes the record of `logical`.
    fn owner_of(&self, logical: &LogicalPath) -> LogicalPath {
        match logical.parent() {
            Some(parent) if !self.mounts.is_mount_root(logical) => parent,
            _ => logical.clone(),
        }
    }

    fn entries(&self, pages: Vec<PageRecord>) -> Result<Vec<Entry>, TreeError> {
        pages
            .into_iter()
            .map(|page| {
                if !page.is_folder {
                    return Ok(Entry::Page(page));
                }
                let record = self
                    .repository
                    .read_folder(&page.logical_path)?
                    .unwrap_or_else(|| {
                        ParsedFolder::stub(
                            page.logical_path.clone(),
                            PhysicalPath::none(),
                            false,
                            page.title.clone(),
                        )
                    });
                Ok(Entry::Folder(Folder::new(record, Some(page))))
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.reindex_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
