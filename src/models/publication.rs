//! Publication record model and the output document that wraps it.

use serde::{Deserialize, Serialize};

/// A single publication as written to the output document
///
/// Every field is always present, even when empty. `citations` is only
/// populated when citation counts are requested and is omitted from the JSON
/// otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationRecord {
    /// Publication title
    #[serde(default)]
    pub title: String,

    /// Authors in display order
    #[serde(default)]
    pub authors: Vec<String>,

    /// Journal, conference or publisher name
    #[serde(default)]
    pub venue: String,

    /// Four-digit year, or empty if unknown
    #[serde(default)]
    pub year: String,

    /// Abstract text, empty unless enrichment ran and succeeded
    #[serde(rename = "abstract", default)]
    pub r#abstract: String,

    /// Citation count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<u32>,
}

impl PublicationRecord {
    /// Create an empty, well-formed record
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the record carries an abstract
    pub fn has_abstract(&self) -> bool {
        !self.r#abstract.is_empty()
    }
}

/// Builder for constructing PublicationRecord objects
#[derive(Debug, Clone, Default)]
pub struct PublicationBuilder {
    record: PublicationRecord,
}

impl PublicationBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            record: PublicationRecord {
                title: title.into(),
                ..PublicationRecord::default()
            },
        }
    }

    /// Set authors
    pub fn authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.record.authors = authors.into_iter().map(Into::into).collect();
        self
    }

    /// Set venue
    pub fn venue(mut self, venue: impl Into<String>) -> Self {
        self.record.venue = venue.into();
        self
    }

    /// Set year
    pub fn year(mut self, year: impl Into<String>) -> Self {
        self.record.year = year.into();
        self
    }

    /// Set abstract
    pub fn abstract_text(mut self, text: impl Into<String>) -> Self {
        self.record.r#abstract = text.into();
        self
    }

    /// Set citation count
    pub fn citations(mut self, count: u32) -> Self {
        self.record.citations = Some(count);
        self
    }

    pub fn build(self) -> PublicationRecord {
        self.record
    }
}

/// The persisted document: `{"items": [...]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationList {
    pub items: Vec<PublicationRecord>,
}

impl PublicationList {
    pub fn new(items: Vec<PublicationRecord>) -> Self {
        Self { items }
    }

    /// Render the document as indented JSON, keeping non-ASCII text literal
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
