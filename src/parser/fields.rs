//! Fallback-key resolution for structured (JSON) raw units.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Object keys that may carry a nested count (`{"cited_by": {"value": 3}}`)
const NESTED_COUNT_KEYS: &[&str] = &["value", "total", "cited_by"];

/// Ordered alternative source keys per logical field
///
/// For each field the keys are scanned in order and the first present,
/// non-empty value wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldKeys {
    #[serde(default = "default_title_keys")]
    pub title: Vec<String>,

    #[serde(default = "default_author_keys")]
    pub authors: Vec<String>,

    #[serde(default = "default_venue_keys")]
    pub venue: Vec<String>,

    #[serde(default = "default_year_keys")]
    pub year: Vec<String>,

    #[serde(rename = "abstract", default = "default_abstract_keys")]
    pub abstract_text: Vec<String>,

    #[serde(default = "default_citation_keys")]
    pub citations: Vec<String>,
}

impl Default for FieldKeys {
    fn default() -> Self {
        Self {
            title: default_title_keys(),
            authors: default_author_keys(),
            venue: default_venue_keys(),
            year: default_year_keys(),
            abstract_text: default_abstract_keys(),
            citations: default_citation_keys(),
        }
    }
}

fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn default_title_keys() -> Vec<String> {
    keys(&["title"])
}

fn default_author_keys() -> Vec<String> {
    keys(&["author", "authors"])
}

fn default_venue_keys() -> Vec<String> {
    keys(&[
        "venue",
        "journal",
        "conference",
        "booktitle",
        "publisher",
        "publication",
        "source",
    ])
}

fn default_year_keys() -> Vec<String> {
    keys(&["year", "pub_year", "publication_year", "publication_date"])
}

fn default_abstract_keys() -> Vec<String> {
    keys(&["abstract", "description", "summary"])
}

fn default_citation_keys() -> Vec<String> {
    keys(&["num_citations", "citations", "cited_by", "total_citations"])
}

/// First present, non-empty textual value among `keys`, or empty text
pub fn resolve_text(obj: &Map<String, Value>, keys: &[String]) -> String {
    resolve_joined(obj, keys, ", ")
}

/// Like [`resolve_text`], but list values are joined with " and " so the
/// author normalizer can split them under either split rule
pub fn resolve_authors(obj: &Map<String, Value>, keys: &[String]) -> String {
    resolve_joined(obj, keys, " and ")
}

fn resolve_joined(obj: &Map<String, Value>, keys: &[String], joiner: &str) -> String {
    keys.iter()
        .filter_map(|key| obj.get(key))
        .find_map(|value| value_text(value, joiner))
        .unwrap_or_default()
}

/// First value among `keys` that reads as a non-negative count
pub fn resolve_count(obj: &Map<String, Value>, keys: &[String]) -> Option<u32> {
    keys.iter()
        .filter_map(|key| obj.get(key))
        .find_map(|value| value_count(value, 0))
}

fn value_text(value: &Value, joiner: &str) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(inner) => inner.get("name").and_then(|n| value_text(n, joiner)),
                Value::Array(_) => None,
                other => value_text(other, joiner),
            })
            .collect::<Vec<_>>()
            .join(joiner),
        Value::Null | Value::Bool(_) | Value::Object(_) => return None,
    };

    (!text.is_empty()).then_some(text)
}

fn value_count(value: &Value, depth: usize) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => {
            let digits: String = s.chars().filter(char::is_ascii_digit).collect();
            digits.parse().ok()
        }
        Value::Object(inner) if depth < 3 => NESTED_COUNT_KEYS
            .iter()
            .filter_map(|key| inner.get(*key))
            .find_map(|v| value_count(v, depth + 1)),
        _ => None,
    }
}
