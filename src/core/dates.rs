//! ISO-8601 date normalization for configuration trees
//!
//! Input files are plain JSON (or TOML), which have no date type. Filters such as
//! `{"createdAt": {"$gte": "2024-01-01T00:00:00Z"}}` only match BSON dates on the
//! server, so every string leaf that looks like an ISO-8601 instant is rewritten
//! into a [`Bson::DateTime`] before the configuration is used.
//!
//! The walk is depth-first and rewrites each leaf independently; keys, key order
//! and array lengths are preserved.

use mongodb::bson::{Bson, DateTime, Document};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

static ISO_INSTANT: OnceLock<Regex> = OnceLock::new();

fn iso_instant() -> &'static Regex {
    ISO_INSTANT.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})$").unwrap()
    })
}

/// Parses `value` as an ISO-8601 instant if it has the expected shape
///
/// Returns `None` for strings that do not match, and for strings that match the
/// shape but do not name a real instant (e.g. month 13).
pub fn parse_iso_instant(value: &str) -> Option<DateTime> {
    if !iso_instant().is_match(value) {
        return None;
    }
    chrono::DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|parsed| DateTime::from_millis(parsed.timestamp_millis()))
}

/// Converts a parsed JSON tree into BSON, turning date-like strings into dates
///
/// # Example
///
/// ```
/// use mongo_exporter::core::dates::normalize_dates;
/// use mongodb::bson::Bson;
/// use serde_json::json;
///
/// let tree = normalize_dates(json!({"createdAt": {"$gte": "2024-01-01T00:00:00Z"}}));
/// let filter = tree.as_document().unwrap().get_document("createdAt").unwrap();
/// assert!(matches!(filter.get("$gte"), Some(Bson::DateTime(_))));
/// ```
pub fn normalize_dates(value: Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                match i32::try_from(i) {
                    Ok(small) => Bson::Int32(small),
                    Err(_) => Bson::Int64(i),
                }
            } else {
                Bson::Double(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => match parse_iso_instant(&s) {
            Some(date) => Bson::DateTime(date),
            None => Bson::String(s),
        },
        Value::Array(items) => Bson::Array(items.into_iter().map(normalize_dates).collect()),
        Value::Object(map) => {
            let mut doc = Document::new();
            for (key, item) in map {
                doc.insert(key, normalize_dates(item));
            }
            Bson::Document(doc)
        }
    }
}

/// Same rewrite as [`normalize_dates`] on a tree that is already BSON
pub fn normalize_bson(value: Bson) -> Bson {
    match value {
        Bson::String(s) => match parse_iso_instant(&s) {
            Some(date) => Bson::DateTime(date),
            None => Bson::String(s),
        },
        Bson::Array(items) => Bson::Array(items.into_iter().map(normalize_bson).collect()),
        Bson::Document(doc) => Bson::Document(
            doc.into_iter()
                .map(|(key, item)| (key, normalize_bson(item)))
                .collect(),
        ),
        other => other,
    }
}
