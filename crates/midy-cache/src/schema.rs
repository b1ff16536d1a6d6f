//! Table definitions.
//!
//! Column names are part of the on-disk format and stay camelCase.

use rusqlite::Connection;

use crate::CacheError;

/// Schema version stored in `PRAGMA user_version`.
pub(crate) const SCHEMA_VERSION: i32 = 1;

const CREATE: &str = r#"
CREATE TABLE IF NOT EXISTS folder (
    logicalPath TEXT PRIMARY KEY NOT NULL,
    physicalPath TEXT NOT NULL,
    parent TEXT REFERENCES folder(logicalPath) ON DELETE CASCADE,
    flatten INTEGER NOT NULL DEFAULT 0,
    mtime REAL NOT NULL DEFAULT 0,
    title TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS folder_parent ON folder(parent);

CREATE TABLE IF NOT EXISTS page (
    logicalPath TEXT PRIMARY KEY NOT NULL,
    folder TEXT REFERENCES folder(logicalPath) ON DELETE CASCADE,
    files TEXT NOT NULL,
    title TEXT NOT NULL,
    "order" INTEGER NOT NULL DEFAULT 0,
    hidden INTEGER NOT NULL DEFAULT 0,
    routable INTEGER NOT NULL DEFAULT 0,
    isFolder INTEGER NOT NULL DEFAULT 0,
    publishDate INTEGER,
    lastModifiedDate INTEGER,
    pathName TEXT NOT NULL,
    summary TEXT NOT NULL DEFAULT '',
    tags TEXT NOT NULL DEFAULT '[]'
);
CREATE INDEX IF NOT EXISTS page_folder ON page(folder);
"#;

const DROP: &str = "
DROP TABLE IF EXISTS page;
DROP TABLE IF EXISTS folder;
";

/// Create tables if absent.
///
/// A database written by a different schema version is rebuilt; the index
/// is derived data and can always be regenerated from the filesystem.
pub(crate) fn ensure(conn: &Connection) -> Result<(), CacheError> {
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if version != 0 && version != SCHEMA_VERSION {
        tracing::info!(
            found = version,
            expected = SCHEMA_VERSION,
            "Index schema version mismatch, rebuilding"
        );
        conn.execute_batch(DROP)?;
    }
    conn.execute_batch(CREATE)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}

/// Drop and recreate all tables.
pub(crate) fn recreate(conn: &Connection) -> Result<(), CacheError> {
    conn.execute_batch(DROP)?;
    conn.execute_batch(CREATE)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}
