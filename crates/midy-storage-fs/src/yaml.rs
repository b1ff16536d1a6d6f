//! YAML frontmatter parsing.
//!
//! Frontmatter is parsed into a JSON object first; known keys are then moved
//! into [`ParsedFrontmatter`] fields and everything else is kept in `other`.
//!
//! | Field | Keys |
//! |-------|------|
//! | `title` | `title` |
//! | `summary` | `summary`, `description` |
//! | `tags` | `tags` (list or comma-separated string) |
//! | `slug` | `slug` |
//! | `hidden` / `routable` | `hidden` / `routable` |
//! | `publish_date` | `published`, `date`, `publishDate` |
//! | `last_modified_date` | `updated`, `lastModified`, `lastModifiedDate` |

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use midy_storage::ParsedFrontmatter;
use serde_json::{Map, Value};

/// Parse YAML into an object.
///
/// Blank content yields an empty object. Malformed YAML or a non-mapping
/// document is logged and yields an empty object, so a broken header never
/// hides a page.
pub(crate) fn parse_mapping(content: &str, path: &Path) -> Map<String, Value> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Map::new();
    }
    match serde_yaml::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => map,
        Ok(Value::Null) => Map::new(),
        Ok(_) => {
            tracing::warn!(path = %path.display(), "Frontmatter is not a mapping, ignoring");
            Map::new()
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Malformed frontmatter, ignoring");
            Map::new()
        }
    }
}

/// Move known keys out of `map` into frontmatter.
///
/// `routable` and `hidden` fall back to the given defaults.
pub(crate) fn into_frontmatter(
    mut map: Map<String, Value>,
    routable: bool,
    hidden: bool,
) -> ParsedFrontmatter {
    ParsedFrontmatter {
        title: take_string(&mut map, &["title"]),
        summary: take_string(&mut map, &["summary", "description"]).unwrap_or_default(),
        tags: take_tags(&mut map),
        slug: take_string(&mut map, &["slug"]).filter(|s| !s.is_empty()),
        hidden: take_bool(&mut map, "hidden").unwrap_or(hidden),
        routable: take_bool(&mut map, "routable").unwrap_or(routable),
        publish_date: take_date(&mut map, &["published", "date", "publishDate"]),
        last_modified_date: take_date(&mut map, &["updated", "lastModified", "lastModifiedDate"]),
        other: map,
    }
}

/// Parse a date as Unix seconds.
///
/// Accepts integers, RFC 3339 timestamps, `YYYY-MM-DD HH:MM:SS` and
/// `YYYY-MM-DD` (midnight UTC).
pub(crate) fn parse_date(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(ts) = s.parse::<i64>() {
                return Some(ts);
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.timestamp());
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt.and_utc().timestamp());
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc().timestamp())
        }
        _ => None,
    }
}

fn take(map: &mut Map<String, Value>, keys: &[&str]) -> Option<Value> {
    let mut found = None;
    for key in keys {
        if let Some(value) = map.remove(*key)
            && found.is_none()
        {
            found = Some(value);
        }
    }
    found
}

fn take_string(map: &mut Map<String, Value>, keys: &[&str]) -> Option<String> {
    match take(map, keys)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn take_bool(map: &mut Map<String, Value>, key: &str) -> Option<bool> {
    match take(map, &[key])? {
        Value::Bool(b) => Some(b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        _ => None,
    }
}

fn take_tags(map: &mut Map<String, Value>) -> Vec<String> {
    let tags: Vec<String> = match take(map, &["tags"]) {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) => s.split(',').map(str::to_owned).collect(),
        _ => Vec::new(),
    };
    let mut unique = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_owned();
        if !tag.is_empty() && !unique.contains(&tag) {
            unique.push(tag);
        }
    }
    unique
}

fn take_date(map: &mut Map<String, Value>, keys: &[&str]) -> Option<i64> {
    take(map, keys).as_ref().and_then(parse_date)
}
