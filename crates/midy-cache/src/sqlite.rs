//! SQLite-backed [`Repository`].

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use midy_storage::{
    FileDescriptor, LogicalPath, PageRecord, ParsedFolder, PhysicalPath, title_from_name,
};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use crate::query::{PageQuery, QueryResult};
use crate::{CacheError, FolderIndex, Repository, schema};

const FOLDER_COLUMNS: &str = "logicalPath, physicalPath, flatten, mtime, title";

const PAGE_COLUMNS: &str = r#"logicalPath, folder, files, title, "order", hidden, routable, isFolder, publishDate, lastModifiedDate, pathName, summary, tags"#;

/// How an upsert treats the stored mtime of an existing row.
#[derive(Clone, Copy)]
enum Mtime {
    /// Overwrite with the new value.
    Replace,
    /// Keep the stored value while the physical path is unchanged.
    KeepIfSamePhysical,
}

/// [`Repository`] over a single SQLite connection.
///
/// The connection is guarded by a mutex; every operation holds it for its
/// whole duration, so batch writes are never interleaved with reads.
pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    /// Open (or create) a database file.
    ///
    /// The parent directory must exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let conn = Connection::open(path.as_ref())?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        tracing::debug!(path = %path.as_ref().display(), journal_mode = %mode, "Opened index database");
        Self::from_connection(conn)
    }

    /// Create a private in-memory database.
    pub fn in_memory() -> Result<Self, CacheError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, CacheError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::ensure(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Repository for SqliteRepository {
    fn write_folder(&self, folder: &ParsedFolder) -> Result<(), CacheError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        ensure_ancestors(&tx, &folder.logical_path)?;
        upsert_folder(&tx, folder, Mtime::Replace)?;
        tx.commit()?;
        Ok(())
    }

    fn read_folder(&self, path: &LogicalPath) -> Result<Option<ParsedFolder>, CacheError> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {FOLDER_COLUMNS} FROM folder WHERE logicalPath = ?1"),
            params![path.as_str()],
            RawFolder::from_row,
        )
        .optional()?
        .map(RawFolder::into_folder)
        .transpose()
    }

    fn delete_folder(&self, path: &LogicalPath) -> Result<(), CacheError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        delete_folder_rows(&tx, path.as_str())?;
        tx.commit()?;
        Ok(())
    }

    fn child_folders(&self, parent: &LogicalPath) -> Result<Vec<ParsedFolder>, CacheError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folder WHERE parent = ?1 ORDER BY logicalPath"
        ))?;
        let rows = stmt.query_map(params![parent.as_str()], RawFolder::from_row)?;
        rows.map(|row| row.map_err(CacheError::from).and_then(RawFolder::into_folder))
            .collect()
    }

    fn write_page(&self, page: &PageRecord) -> Result<(), CacheError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        replace_page(&tx, page)?;
        tx.commit()?;
        Ok(())
    }

    fn read_page(&self, path: &LogicalPath) -> Result<Option<PageRecord>, CacheError> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PAGE_COLUMNS} FROM page WHERE logicalPath = ?1"),
            params![path.as_str()],
            RawPage::from_row,
        )
        .optional()?
        .map(RawPage::into_record)
        .transpose()
    }

    fn delete_page(&self, path: &LogicalPath) -> Result<(), CacheError> {
        self.conn()
            .execute("DELETE FROM page WHERE logicalPath = ?1", params![path.as_str()])?;
        Ok(())
    }

    fn replace_folder(&self, index: &FolderIndex) -> Result<(), CacheError> {
        let path = index.folder.logical_path.as_str();
        let preserved: HashSet<&str> = index.preserve.iter().map(LogicalPath::as_str).collect();

        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let owned_pages: Vec<String> = {
            let sql = if index.owns_index {
                "SELECT logicalPath FROM page WHERE folder = ?1 OR logicalPath = ?1"
            } else {
                "SELECT logicalPath FROM page WHERE folder = ?1"
            };
            let mut stmt = tx.prepare(sql)?;
            stmt.query_map(params![path], |row| row.get(0))?
                .collect::<Result<_, _>>()?
        };
        for page in owned_pages.iter().filter(|p| !preserved.contains(p.as_str())) {
            tx.execute("DELETE FROM page WHERE logicalPath = ?1", params![page])?;
        }

        let keep: HashSet<&str> = index
            .subfolders
            .iter()
            .map(|f| f.logical_path.as_str())
            .chain(preserved.iter().copied())
            .collect();
        let children: Vec<String> = {
            let mut stmt = tx.prepare("SELECT logicalPath FROM folder WHERE parent = ?1")?;
            stmt.query_map(params![path], |row| row.get(0))?
                .collect::<Result<_, _>>()?
        };
        let mut removed = 0usize;
        for child in children.iter().filter(|c| !keep.contains(c.as_str())) {
            delete_folder_rows(&tx, child)?;
            removed += 1;
        }

        ensure_ancestors(&tx, &index.folder.logical_path)?;
        upsert_folder(&tx, &index.folder, Mtime::Replace)?;
        for stub in &index.subfolders {
            upsert_folder(&tx, stub, Mtime::KeepIfSamePhysical)?;
        }
        for page in &index.pages {
            replace_page(&tx, page)?;
        }

        tx.commit()?;
        tracing::debug!(
            folder = %path,
            pages = index.pages.len(),
            subfolders = index.subfolders.len(),
            removed,
            "Replaced folder index"
        );
        Ok(())
    }

    fn query_pages(&self, query: &PageQuery) -> Result<QueryResult, CacheError> {
        let now = chrono::Utc::now().timestamp();
        let (where_sql, params) = query.where_clause(now);

        let conn = self.conn();
        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM page{where_sql}"),
            params_from_iter(params.iter()),
            |row| row.get(0),
        )?;

        let sql = format!(
            "SELECT {PAGE_COLUMNS} FROM page{where_sql}{}{}",
            query.order_clause(),
            query.limit_clause()
        );
        let mut stmt = conn.prepare(&sql)?;
        let pages = stmt
            .query_map(params_from_iter(params.iter()), RawPage::from_row)?
            .map(|row| row.map_err(CacheError::from).and_then(RawPage::into_record))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(QueryResult {
            total: usize::try_from(total).unwrap_or_default(),
            pages,
        })
    }

    fn reinitialize(&self) -> Result<(), CacheError> {
        schema::recreate(&self.conn())?;
        tracing::info!("Reinitialized index schema");
        Ok(())
    }
}

/// Insert virtual rows for missing ancestors so the parent links hold.
fn ensure_ancestors(conn: &Connection, path: &LogicalPath) -> Result<(), CacheError> {
    for ancestor in path.ancestors() {
        conn.execute(
            "INSERT OR IGNORE INTO folder (logicalPath, physicalPath, parent, flatten, mtime, title)
             VALUES (?1, '', ?2, 0, 0, ?3)",
            params![
                ancestor.as_str(),
                ancestor.parent().as_ref().map(LogicalPath::as_str),
                title_from_name(ancestor.name()),
            ],
        )?;
    }
    Ok(())
}

fn upsert_folder(conn: &Connection, folder: &ParsedFolder, mtime: Mtime) -> Result<(), CacheError> {
    let mtime_update = match mtime {
        Mtime::Replace => "excluded.mtime",
        Mtime::KeepIfSamePhysical => {
            "CASE WHEN folder.physicalPath = excluded.physicalPath THEN folder.mtime ELSE excluded.mtime END"
        }
    };
    conn.execute(
        &format!(
            "INSERT INTO folder (logicalPath, physicalPath, parent, flatten, mtime, title)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(logicalPath) DO UPDATE SET
                physicalPath = excluded.physicalPath,
                parent = excluded.parent,
                flatten = excluded.flatten,
                mtime = {mtime_update},
                title = excluded.title"
        ),
        params![
            folder.logical_path.as_str(),
            physical_str(&folder.physical_path),
            folder.parent().as_ref().map(LogicalPath::as_str),
            folder.flatten,
            folder.mtime,
            folder.title,
        ],
    )?;
    Ok(())
}

/// Delete a folder row, its index record, and (by cascade) its subtree.
fn delete_folder_rows(conn: &Connection, path: &str) -> Result<(), CacheError> {
    conn.execute("DELETE FROM page WHERE logicalPath = ?1", params![path])?;
    conn.execute("DELETE FROM folder WHERE logicalPath = ?1", params![path])?;
    tracing::debug!(folder = %path, "Deleted folder rows");
    Ok(())
}

fn replace_page(conn: &Connection, page: &PageRecord) -> Result<(), CacheError> {
    let files: Vec<&FileDescriptor> = page.files.values().collect();
    conn.execute(
        "DELETE FROM page WHERE logicalPath = ?1",
        params![page.logical_path.as_str()],
    )?;
    conn.execute(
        &format!(
            "INSERT INTO page ({PAGE_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
        ),
        params![
            page.logical_path.as_str(),
            page.folder.as_ref().map(LogicalPath::as_str),
            serde_json::to_string(&files)?,
            page.title,
            page.order,
            page.hidden,
            page.routable,
            page.is_folder,
            page.publish_date,
            page.last_modified_date,
            page.path_name,
            page.summary,
            serde_json::to_string(&page.tags)?,
        ],
    )?;
    Ok(())
}

fn physical_str(path: &PhysicalPath) -> String {
    path.as_path().to_string_lossy().into_owned()
}

fn parse_logical(raw: &str) -> Result<LogicalPath, CacheError> {
    LogicalPath::parse(raw).map_err(|e| CacheError::corrupt(raw, e))
}

struct RawFolder {
    logical_path: String,
    physical_path: String,
    flatten: bool,
    mtime: f64,
    title: String,
}

impl RawFolder {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            logical_path: row.get(0)?,
            physical_path: row.get(1)?,
            flatten: row.get(2)?,
            mtime: row.get(3)?,
            title: row.get(4)?,
        })
    }

    fn into_folder(self) -> Result<ParsedFolder, CacheError> {
        Ok(ParsedFolder {
            logical_path: parse_logical(&self.logical_path)?,
            physical_path: PhysicalPath::new(self.physical_path),
            mtime: self.mtime,
            flatten: self.flatten,
            title: self.title,
        })
    }
}

struct RawPage {
    logical_path: String,
    folder: Option<String>,
    files: String,
    title: String,
    order: i64,
    hidden: bool,
    routable: bool,
    is_folder: bool,
    publish_date: Option<i64>,
    last_modified_date: Option<i64>,
    path_name: String,
    summary: String,
    tags: String,
}

impl RawPage {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            logical_path: row.get(0)?,
            folder: row.get(1)?,
            files: row.get(2)?,
            title: row.get(3)?,
            order: row.get(4)?,
            hidden: row.get(5)?,
            routable: row.get(6)?,
            is_folder: row.get(7)?,
            publish_date: row.get(8)?,
            last_modified_date: row.get(9)?,
            path_name: row.get(10)?,
            summary: row.get(11)?,
            tags: row.get(12)?,
        })
    }

    fn into_record(self) -> Result<PageRecord, CacheError> {
        let files: Vec<FileDescriptor> = serde_json::from_str(&self.files)?;
        Ok(PageRecord {
            logical_path: parse_logical(&self.logical_path)?,
            folder: self.folder.as_deref().map(parse_logical).transpose()?,
            files: files
                .into_iter()
                .map(|f| (f.ext.clone(), f))
                .collect::<BTreeMap<_, _>>(),
            title: self.title,
            summary: self.summary,
            order: self.order,
            hidden: self.hidden,
            routable: self.routable,
            is_folder: self.is_folder,
            publish_date: self.publish_date,
            last_modified_date: self.last_modified_date,
            path_name: self.path_name,
            tags: serde_json::from_str(&self.tags)?,
        })
    }
}
