//! Directory listing and ordering prefixes.
//!
//! The scanner only finds entries; interpreting them is the parser's job.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::UNIX_EPOCH;

use regex::Regex;

/// Ordering prefix: digits and separators followed by `_`.
static PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([\d_-]+)_(.*)$").unwrap());

/// One directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Entry {
    pub path: PathBuf,
    pub name: String,
    pub is_dir: bool,
}

/// Split an ordering prefix from a name.
///
/// `05_intro` → `(5, "intro")`, `2024-01-15_post` → `(20240115, "post")`.
/// Names without a prefix (or whose remainder would be empty) get key 0.
/// Keys that do not fit an `i64` are treated as 0.
pub(crate) fn split_prefix(name: &str) -> (i64, &str) {
    let Some(caps) = PREFIX_RE.captures(name) else {
        return (0, name);
    };
    let (Some(prefix), Some(rest)) = (caps.get(1), caps.get(2)) else {
        return (0, name);
    };
    if rest.as_str().is_empty() {
        return (0, name);
    }
    let digits: String = prefix
        .as_str()
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    (digits.parse().unwrap_or(0), rest.as_str())
}

/// Split a file name into `(key, basename, extension)`.
///
/// The extension is lower-cased; the basename has its prefix removed.
pub(crate) fn split_file_name(name: &str) -> (i64, &str, String) {
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, ext.to_lowercase()),
        _ => (name, String::new()),
    };
    let (key, basename) = split_prefix(stem);
    (key, basename, ext)
}

/// List the immediate entries of `dir`, sorted by name.
///
/// Dot-entries are skipped. An unreadable directory yields no entries.
pub(crate) fn list(dir: &Path) -> Vec<Entry> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(path = %dir.display(), error = %e, "Failed to list directory");
            return Vec::new();
        }
    };

    let mut entries: Vec<Entry> = entries
        .filter_map(Result::ok)
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                return None;
            }
            let is_dir = e.file_type().is_ok_and(|t| t.is_dir());
            Some(Entry {
                path: e.path(),
                name,
                is_dir,
            })
        })
        .collect();
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}

/// Every file below `dir` with its depth (0 for immediate children).
pub(crate) fn walk_files(dir: &Path) -> Vec<(Entry, usize)> {
    let mut files = Vec::new();
    walk_into(dir, 0, &mut files);
    files
}

fn walk_into(dir: &Path, depth: usize, files: &mut Vec<(Entry, usize)>) {
    for entry in list(dir) {
        if entry.is_dir {
            walk_into(&entry.path, depth + 1, files);
        } else {
            files.push((entry, depth));
        }
    }
}

/// Every directory below `dir`, excluding `dir` itself.
pub(crate) fn walk_dirs(dir: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in list(&current).into_iter().filter(|e| e.is_dir) {
            pending.push(entry.path.clone());
            dirs.push(entry.path);
        }
    }
    dirs
}

/// Modification time as seconds since the Unix epoch.
pub(crate) fn mtime(path: &Path) -> Option<f64> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    modified
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs_f64())
}
