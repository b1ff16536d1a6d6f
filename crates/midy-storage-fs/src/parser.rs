//! Folder parser.
//!
//! [`Parser::parse_folder`] turns one directory listing into a folder row,
//! stub rows for its subdirectories and aggregated page rows, and writes them
//! through [`Repository::replace_folder`] in one transaction.
//!
//! # Index Files
//!
//! A file named `index.*` stands in for its directory: its record takes the
//! directory's logical path and is listed by the directory's parent. The
//! parent's parse writes it eagerly, so a listing can show a subfolder's title
//! without visiting the subfolder. Only the root and mount roots (which have no
//! parent parse to rely on) write their own index record.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use midy_cache::{CacheError, FolderIndex, Repository};
use midy_storage::{
    DEFAULT_CONTROL_FILENAME, FolderControl, INDEX_NAME, InterpreterRegistry, LogicalPath,
    MountTable, PageRecord, ParsedFile, ParsedFolder, PhysicalPath, title_from_name,
};

use crate::scanner::{self, Entry};

/// Directory listing to index rows.
pub struct Parser {
    repository: Arc<dyn Repository>,
    registry: InterpreterRegistry,
    control_filename: String,
    index_name: String,
}

/// Where a produced file record belongs.
struct Listing<'a> {
    logical: &'a LogicalPath,
    control: FolderControl,
    owns_index: bool,
    own_order: i64,
}

impl Parser {
    /// Create a parser writing to `repository`.
    #[must_use]
    pub fn new(repository: Arc<dyn Repository>, registry: InterpreterRegistry) -> Self {
        Self {
            repository,
            registry,
            control_filename: DEFAULT_CONTROL_FILENAME.to_owned(),
            index_name: INDEX_NAME.to_owned(),
        }
    }

    /// Use a different control file name.
    #[must_use]
    pub fn with_control_filename(mut self, name: impl Into<String>) -> Self {
        self.control_filename = name.into();
        self
    }

    /// Use a different index basename.
    #[must_use]
    pub fn with_index_name(mut self, name: impl Into<String>) -> Self {
        self.index_name = name.into();
        self
    }

    /// Control file name.
    #[must_use]
    pub fn control_filename(&self) -> &str {
        &self.control_filename
    }

    /// Index basename.
    #[must_use]
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Live modification time of a folder as stored by [`parse_folder`].
    ///
    /// The maximum of the directory's mtime and its control file's mtime.
    /// Each subdirectory adds its own mtime, its control file and its index
    /// files, since those feed the index records this folder lists.
    /// Flattened folders include every descendant directory instead. Returns
    /// `None` when the directory does not exist.
    ///
    /// [`parse_folder`]: Self::parse_folder
    #[must_use]
    pub fn folder_mtime(&self, physical: &PhysicalPath) -> Option<f64> {
        if !physical.is_dir() {
            return None;
        }
        let dir = physical.as_path();
        let control_path = dir.join(&self.control_filename);
        let flatten = FolderControl::read(&control_path).flatten;

        let mut watched = vec![control_path];
        if flatten {
            watched.extend(scanner::walk_dirs(dir));
        } else {
            for sub in scanner::list(dir).into_iter().filter(|entry| entry.is_dir) {
                watched.push(sub.path.join(&self.control_filename));
                watched.extend(self.index_entries(&sub.path).into_iter().map(|e| e.path));
                watched.push(sub.path);
            }
        }
        let latest = scanner::mtime(dir)?;
        Some(
            watched
                .iter()
                .filter_map(|path| scanner::mtime(path))
                .fold(latest, f64::max),
        )
    }

    /// Reindex one folder.
    ///
    /// Returns `Ok(false)` without writing anything when `physical` is not
    /// an existing directory.
    ///
    /// # Arguments
    ///
    /// * `physical` - Directory to list
    /// * `logical` - Logical path of the folder
    /// * `mounts` - Mount table, used to name mounted subdirectories and to
    ///   keep logical children that lead to mounts
    pub fn parse_folder(
        &self,
        physical: &PhysicalPath,
        logical: &LogicalPath,
        mounts: &MountTable,
    ) -> Result<bool, CacheError> {
        // Read mtimes before listing so a file added mid-parse makes the row stale.
        let Some(mtime) = self.folder_mtime(physical) else {
            tracing::debug!(folder = %logical, physical = %physical, "Folder directory missing");
            return Ok(false);
        };
        let dir = physical.as_path();
        let listing = Listing {
            logical,
            control: FolderControl::read(&dir.join(&self.control_filename)),
            owns_index: mounts.is_mount_root(logical),
            own_order: if logical.is_root() {
                0
            } else {
                self.own_index_order(dir)
            },
        };

        let mut files = Vec::new();
        let mut subfolders = Vec::new();
        if listing.control.flatten {
            for (entry, depth) in scanner::walk_files(dir) {
                self.collect_file(&entry, depth, &listing, &mut files);
            }
        } else {
            for entry in scanner::list(dir) {
                if entry.is_dir {
                    self.collect_subfolder(&entry, &listing, mounts, &mut subfolders, &mut files);
                } else {
                    self.collect_file(&entry, 0, &listing, &mut files);
                }
            }
        }

        let mut groups: BTreeMap<LogicalPath, Vec<ParsedFile>> = BTreeMap::new();
        for file in files {
            groups.entry(file.logical_path.clone()).or_default().push(file);
        }
        let pages: Vec<PageRecord> = groups
            .into_values()
            .filter_map(PageRecord::aggregate)
            .collect();

        let index = FolderIndex {
            folder: ParsedFolder {
                logical_path: logical.clone(),
                physical_path: physical.clone(),
                mtime,
                flatten: listing.control.flatten,
                title: title_from_name(logical.name()),
            },
            subfolders,
            pages,
            owns_index: listing.owns_index,
            preserve: mounts.preserved_under(logical),
        };
        self.repository.replace_folder(&index)?;

        tracing::debug!(
            folder = %logical,
            physical = %physical,
            pages = index.pages.len(),
            subfolders = index.subfolders.len(),
            "Parsed folder"
        );
        Ok(true)
    }

    fn collect_file(
        &self,
        entry: &Entry,
        depth: usize,
        listing: &Listing<'_>,
        files: &mut Vec<ParsedFile>,
    ) {
        if entry.name == self.control_filename {
            return;
        }
        let (key, basename, ext) = scanner::split_file_name(&entry.name);

        if basename == self.index_name {
            if depth > 0 || !listing.owns_index {
                return;
            }
            let folder_title = title_from_name(listing.logical.name());
            let Some(mut file) =
                self.interpret(&entry.path, listing.logical, basename, ext, &folder_title)
            else {
                return;
            };
            file.logical_path = listing.logical.clone();
            file.folder = listing.logical.parent();
            file.path_name = listing.logical.name().to_owned();
            file.slug = None;
            file.order = listing.own_order;
            file.hidden |= listing.control.hidden;
            file.is_folder = true;
            files.push(file);
            return;
        }

        let title = title_from_name(basename);
        if let Some(mut file) = self.interpret(&entry.path, listing.logical, basename, ext, &title) {
            file.order = listing.control.order.apply(key);
            files.push(file);
        }
    }

    fn collect_subfolder(
        &self,
        entry: &Entry,
        listing: &Listing<'_>,
        mounts: &MountTable,
        subfolders: &mut Vec<ParsedFolder>,
        files: &mut Vec<ParsedFile>,
    ) {
        let physical = PhysicalPath::new(&entry.path);
        let (key, dir_name) = scanner::split_prefix(&entry.name);

        if let Some(mounted) = mounts.logical_for(&physical) {
            // Mounted directories index themselves, including their index record.
            if mounted.parent().as_ref() == Some(listing.logical) {
                let control = FolderControl::read(&entry.path.join(&self.control_filename));
                subfolders.push(ParsedFolder::stub(
                    mounted.clone(),
                    physical,
                    control.flatten,
                    title_from_name(mounted.name()),
                ));
            }
            return;
        }

        let child = listing.logical.join(dir_name);
        if mounts.is_mount_root(&child) {
            tracing::debug!(
                folder = %child,
                physical = %physical,
                "Directory shadowed by a mount, skipping"
            );
            return;
        }

        let control = FolderControl::read(&entry.path.join(&self.control_filename));
        subfolders.push(ParsedFolder::stub(
            child.clone(),
            physical,
            control.flatten,
            title_from_name(dir_name),
        ));

        let folder_title = title_from_name(dir_name);
        for index_entry in self.index_entries(&entry.path) {
            let (_, basename, ext) = scanner::split_file_name(&index_entry.name);
            let Some(mut file) =
                self.interpret(&index_entry.path, &child, basename, ext, &folder_title)
            else {
                continue;
            };
            file.logical_path = child.clone();
            file.folder = Some(listing.logical.clone());
            file.path_name = dir_name.to_owned();
            file.slug = None;
            file.order = listing.control.order.apply(key);
            file.hidden |= control.hidden;
            file.is_folder = true;
            files.push(file);
        }
    }

    /// Index files directly inside `dir`.
    fn index_entries(&self, dir: &Path) -> Vec<Entry> {
        scanner::list(dir)
            .into_iter()
            .filter(|entry| {
                !entry.is_dir && scanner::split_file_name(&entry.name).1 == self.index_name
            })
            .collect()
    }

    /// Interpret one file as a page variant listed by `parent`.
    fn interpret(
        &self,
        path: &Path,
        parent: &LogicalPath,
        basename: &str,
        ext: String,
        fallback_title: &str,
    ) -> Option<ParsedFile> {
        let frontmatter = self.registry.map(path, parent, basename)?;
        let physical = PhysicalPath::new(path);
        let mtime = physical.mtime().unwrap_or_default();

        let slug = frontmatter.slug.filter(|slug| {
            let valid = !slug.contains('/') && slug != "." && slug != "..";
            if !valid {
                tracing::warn!(path = %path.display(), slug = %slug, "Invalid slug, ignoring");
            }
            valid
        });

        Some(ParsedFile {
            logical_path: parent.join(slug.as_deref().unwrap_or(basename)),
            ext,
            physical_path: physical,
            mtime,
            order: 0,
            publish_date: frontmatter.publish_date,
            last_modified_date: frontmatter
                .last_modified_date
                .or_else(|| Some(unix_seconds(mtime))),
            routable: frontmatter.routable,
            path_name: basename.to_owned(),
            folder: Some(parent.clone()),
            title: frontmatter
                .title
                .unwrap_or_else(|| fallback_title.to_owned()),
            summary: frontmatter.summary,
            tags: frontmatter.tags,
            slug,
            hidden: frontmatter.hidden,
            other: frontmatter.other,
            is_folder: false,
        })
    }

    /// Sort key of a directory's own index record.
    ///
    /// Taken from the directory name's prefix with the polarity of the
    /// physical parent's control file.
    fn own_index_order(&self, dir: &Path) -> i64 {
        let Some(name) = dir.file_name() else {
            return 0;
        };
        let (key, _) = scanner::split_prefix(&name.to_string_lossy());
        let polarity = dir
            .parent()
            .map(|parent| FolderControl::read(&parent.join(&self.control_filename)).order)
            .unwrap_or_default();
        polarity.apply(key)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn unix_seconds(mtime: f64) -> i64 {
    mtime.floor() as i64
}

#[cfg(test)]
mod tests {
    use std::fs;

    use midy_cache::{PageQuery, PublishedBefore, SqliteRepository};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::default_registry;

    struct Fixture {
        dir: tempfile::TempDir,
        repo: Arc<SqliteRepository>,
        parser: Parser,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let repo = Arc::new(SqliteRepository::in_memory().unwrap());
            let parser = Parser::new(repo.clone(), default_registry());
            Self { dir, repo, parser }
        }

        fn write(&self, rel: &str, content: &str) {
            let path = self.dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }

        fn physical(&self, rel: &str) -> PhysicalPath {
            PhysicalPath::new(self.dir.path().join(rel))
        }

        fn mounts(&self) -> MountTable {
            MountTable::new(self.physical(""))
        }

        fn parse(&self, rel: &str, logical: &str) -> bool {
            self.parser
                .parse_folder(&self.physical(rel), &lp(logical), &self.mounts())
                .unwrap()
        }

        fn listing(&self, folder: &str) -> Vec<String> {
            self.repo
                .query_pages(
                    &PageQuery::new()
                        .folder(lp(folder))
                        .include_hidden(true)
                        .published_before(PublishedBefore::Disabled),
                )
                .unwrap()
                .pages
                .into_iter()
                .map(|p| p.logical_path.to_string())
                .collect()
        }
    }

    fn lp(raw: &str) -> LogicalPath {
        LogicalPath::parse(raw).unwrap()
    }

    #[test]
    fn test_missing_directory_returns_false() {
        let fx = Fixture::new();
        assert!(!fx.parse("missing", "/missing"));
        assert!(fx.repo.read_folder(&lp("/missing")).unwrap().is_none());
    }

    fn shift_mtime(path: &Path, secs: u64) {
        let modified = fs::metadata(path).unwrap().modified().unwrap();
        fs::File::open(path)
            .unwrap()
            .set_modified(modified + std::time::Duration::from_secs(secs))
            .unwrap();
    }

    #[test]
    fn test_folder_mtime_follows_child_index_and_control() {
        let fx = Fixture::new();
        fx.write("sub/index.md", "# Sub");
        fx.write("sub/folder.midy", "{}");
        fx.write("sub/deeper/page.md", "# Page");
        let root = fx.physical("");
        let before = fx.parser.folder_mtime(&root).unwrap();

        shift_mtime(&fx.dir.path().join("sub/index.md"), 100);
        let after_index = fx.parser.folder_mtime(&root).unwrap();
        assert!(after_index > before);

        shift_mtime(&fx.dir.path().join("sub/folder.midy"), 200);
        assert!(fx.parser.folder_mtime(&root).unwrap() > after_index);
    }

    #[test]
    fn test_folder_mtime_ignores_grandchildren() {
        let fx = Fixture::new();
        fx.write("sub/deeper/page.md", "# Page");
        let root = fx.physical("");
        let before = fx.parser.folder_mtime(&root).unwrap();

        shift_mtime(&fx.dir.path().join("sub/deeper"), 100);

        assert!((fx.parser.folder_mtime(&root).unwrap() - before).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ascending_order_with_folder_index() {
        let fx = Fixture::new();
        fx.write("01_z.md", "# Z");
        fx.write("02_k.md", "# K");
        fx.write("05_j.md", "# J");
        fx.write("07_a/index.md", "# A");

        assert!(fx.parse("", "/"));

        assert_eq!(fx.listing("/"), vec!["/z", "/k", "/j", "/a"]);
    }

    #[test]
    fn test_descending_order() {
        let fx = Fixture::new();
        fx.write("folder.midy", r#"{"order": "desc"}"#);
        fx.write("01_z.md", "# Z");
        fx.write("02_k.md", "# K");
        fx.write("05_j.md", "# J");
        fx.write("07_a/index.md", "# A");

        fx.parse("", "/");

        assert_eq!(fx.listing("/"), vec!["/a", "/j", "/k", "/z"]);
    }

    #[test]
    fn test_prefixed_directory_stub() {
        let fx = Fixture::new();
        fx.write("03_guides/intro.md", "# Intro");

        fx.parse("", "/");

        let stub = fx.repo.read_folder(&lp("/guides")).unwrap().unwrap();
        assert_eq!(stub.physical_path, fx.physical("03_guides"));
        assert!(stub.mtime.abs() < f64::EPSILON);
        assert_eq!(stub.title, "Guides");
    }

    #[test]
    fn test_variants_aggregate_into_one_page() {
        let fx = Fixture::new();
        fx.write("contact.md", "---\ntitle: Contact (md)\ntags: [a]\n---\n");
        fx.write("contact.latte", "{*\ntitle: Contact\ntags: [b]\n*}\n");
        fx.write("about.md", "# About");

        fx.parse("", "/");

        assert_eq!(fx.listing("/"), vec!["/about", "/contact"]);
        let page = fx.repo.read_page(&lp("/contact")).unwrap().unwrap();
        assert_eq!(page.title, "Contact");
        assert_eq!(page.tags, vec!["b", "a"]);
        assert_eq!(page.files.keys().collect::<Vec<_>>(), vec!["latte", "md"]);
    }

    #[test]
    fn test_unsupported_and_reserved_files_skipped() {
        let fx = Fixture::new();
        fx.write("notes.xyz", "binary");
        fx.write("README", "no extension");
        fx.write("folder.midy", "{}");
        fx.write("page.md", "# Page");

        fx.parse("", "/");

        assert_eq!(fx.listing("/"), vec!["/page"]);
    }

    #[test]
    fn test_title_falls_back_to_basename() {
        let fx = Fixture::new();
        fx.write("01_getting-started.md", "no heading");

        fx.parse("", "/");

        let page = fx.repo.read_page(&lp("/getting-started")).unwrap().unwrap();
        assert_eq!(page.title, "Getting Started");
        assert_eq!(page.path_name, "getting-started");
        assert!(page.last_modified_date.is_some());
    }

    #[test]
    fn test_slug_overrides_basename() {
        let fx = Fixture::new();
        fx.write("2024-01-15_post.md", "---\nslug: hello-world\n---\n# Hello");

        fx.parse("", "/");

        assert_eq!(fx.listing("/"), vec!["/hello-world"]);
    }

    #[test]
    fn test_index_record_belongs_to_parent_listing() {
        let fx = Fixture::new();
        fx.write("foo/bar/index.md", "# Bar");
        fx.write("foo/bar/child.md", "# Child");

        fx.parse("", "/");
        fx.parse("foo", "/foo");
        fx.parse("foo/bar", "/foo/bar");

        assert_eq!(fx.listing("/foo"), vec!["/foo/bar"]);
        assert_eq!(fx.listing("/foo/bar"), vec!["/foo/bar/child"]);
        let index = fx.repo.read_page(&lp("/foo/bar")).unwrap().unwrap();
        assert!(index.is_folder);
        assert_eq!(index.title, "Bar");
        assert_eq!(index.folder, Some(lp("/foo")));
    }

    #[test]
    fn test_root_writes_own_index() {
        let fx = Fixture::new();
        fx.write("index.md", "# Welcome");
        fx.write("about.md", "# About");

        fx.parse("", "/");

        let root = fx.repo.read_page(&LogicalPath::root()).unwrap().unwrap();
        assert_eq!(root.title, "Welcome");
        assert!(root.is_folder);
        assert_eq!(root.folder, None);
        assert_eq!(fx.listing("/"), vec!["/about"]);
    }

    #[test]
    fn test_hidden_control_hides_folder_index() {
        let fx = Fixture::new();
        fx.write("drafts/folder.midy", r#"{"hidden": true}"#);
        fx.write("drafts/index.md", "# Drafts");
        fx.write("drafts/wip.md", "# WIP");

        fx.parse("", "/");
        fx.parse("drafts", "/drafts");

        let index = fx.repo.read_page(&lp("/drafts")).unwrap().unwrap();
        assert!(index.hidden);
        let wip = fx.repo.read_page(&lp("/drafts/wip")).unwrap().unwrap();
        assert!(!wip.hidden);
    }

    #[test]
    fn test_flatten_lists_descendants_directly() {
        let fx = Fixture::new();
        fx.write("blog/folder.midy", r#"{"flatten": true}"#);
        fx.write("blog/2023/old.md", "# Old");
        fx.write("blog/2024/01_new.md", "# New");
        fx.write("blog/2024/index.md", "# Year");
        fx.write("blog/2024/folder.midy", "{}");

        fx.parse("blog", "/blog");

        assert_eq!(fx.listing("/blog"), vec!["/blog/old", "/blog/new"]);
        assert!(fx.repo.child_folders(&lp("/blog")).unwrap().is_empty());
        assert!(fx.repo.read_folder(&lp("/blog")).unwrap().unwrap().flatten);
    }

    #[test]
    fn test_reparse_is_idempotent() {
        let fx = Fixture::new();
        fx.write("a.md", "---\ntitle: A\ndate: 2020-01-01\n---\n");
        fx.write("sub/index.md", "# Sub");

        fx.parse("", "/");
        let folder = fx.repo.read_folder(&LogicalPath::root()).unwrap();
        let pages = fx.repo.query_pages(&PageQuery::new().folder(LogicalPath::root())).unwrap();

        fx.parse("", "/");

        assert_eq!(fx.repo.read_folder(&LogicalPath::root()).unwrap(), folder);
        assert_eq!(
            fx.repo.query_pages(&PageQuery::new().folder(LogicalPath::root())).unwrap(),
            pages
        );
    }

    #[test]
    fn test_reparse_removes_deleted_files() {
        let fx = Fixture::new();
        fx.write("a.md", "# A");
        fx.write("b.md", "# B");
        fx.write("gone/x.md", "# X");
        fx.parse("", "/");

        fs::remove_file(fx.dir.path().join("b.md")).unwrap();
        fs::remove_dir_all(fx.dir.path().join("gone")).unwrap();
        fx.parse("", "/");

        assert_eq!(fx.listing("/"), vec!["/a"]);
        assert!(fx.repo.read_folder(&lp("/gone")).unwrap().is_none());
    }

    #[test]
    fn test_distinct_paths_counted_once() {
        let fx = Fixture::new();
        fx.write("a.md", "# A");
        fx.write("a.html", "<p>a</p>");
        fx.write("b.md", "# B");
        fx.write("style.css", "body {}");

        fx.parse("", "/");

        let result = fx
            .repo
            .query_pages(
                &PageQuery::new()
                    .folder(LogicalPath::root())
                    .include_hidden(true),
            )
            .unwrap();
        assert_eq!(result.total, 3);
        assert_eq!(result.pages.len(), 3);
    }

    #[test]
    fn test_mounted_subdirectory_uses_mount_name() {
        let fx = Fixture::new();
        fx.write("admin-pages/index.md", "# Admin");
        fx.write("admin-pages/users.md", "# Users");
        let mut mounts = fx.mounts();
        mounts.mount(lp("/admin"), fx.physical("admin-pages"));

        fx.parser
            .parse_folder(&fx.physical(""), &LogicalPath::root(), &mounts)
            .unwrap();

        let stub = fx.repo.read_folder(&lp("/admin")).unwrap().unwrap();
        assert_eq!(stub.physical_path, fx.physical("admin-pages"));
        assert!(fx.repo.read_folder(&lp("/admin-pages")).unwrap().is_none());
        assert!(fx.repo.read_page(&lp("/admin")).unwrap().is_none());
    }

    #[test]
    fn test_custom_control_and_index_names() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(SqliteRepository::in_memory().unwrap());
        let parser = Parser::new(repo.clone(), default_registry())
            .with_control_filename("_folder.json")
            .with_index_name("_index");
        fs::write(dir.path().join("_folder.json"), r#"{"order": "desc"}"#).unwrap();
        fs::write(dir.path().join("01_a.md"), "# A").unwrap();
        fs::write(dir.path().join("02_b.md"), "# B").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/_index.md"), "# Sub").unwrap();
        let root = PhysicalPath::new(dir.path());

        parser
            .parse_folder(&root, &LogicalPath::root(), &MountTable::new(root.clone()))
            .unwrap();

        let pages = repo
            .query_pages(&PageQuery::new().folder(LogicalPath::root()))
            .unwrap()
            .pages;
        let paths: Vec<_> = pages.iter().map(|p| p.logical_path.as_str()).collect();
        assert_eq!(paths, vec!["/b", "/a", "/sub"]);
    }
}
