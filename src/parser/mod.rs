//! Record parser: one raw unit in, one partially populated record out.
//!
//! Structured units resolve each logical field through its fallback-key list
//! ([`FieldKeys`]); markup units resolve it through a list of CSS selectors
//! ([`MarkupSelectors`]). Missing fields become empty text. Only a unit with
//! an unexpected overall shape fails, and that failure is returned as a
//! [`ParseError`] for the caller to record and skip.
//!
//! Authors are stored unsplit as a single element; splitting belongs to the
//! normalization step. The abstract is always left empty here.

mod fields;
mod markup;

pub use fields::{resolve_authors, resolve_count, resolve_text, FieldKeys};
pub use markup::{CompiledSelectors, MarkupSelectors, RowFields};

pub(crate) use markup::{compile_all, element_text};

use serde_json::Value;

use crate::models::{PublicationRecord, RawUnit};

/// Why a raw unit could not be turned into a record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),

    #[error("no publication fields found in markup: {0}")]
    UnrecognizedMarkup(String),

    #[error("invalid selector {0}")]
    InvalidSelector(String),
}

/// Converts raw units into publication records
#[derive(Debug, Clone)]
pub struct RecordParser {
    keys: FieldKeys,
    selectors: CompiledSelectors,
    include_citations: bool,
}

impl RecordParser {
    /// Create a parser; fails only on invalid selector configuration
    pub fn new(keys: FieldKeys, markup: &MarkupSelectors) -> Result<Self, ParseError> {
        Ok(Self {
            keys,
            selectors: CompiledSelectors::compile(markup)?,
            include_citations: false,
        })
    }

    /// Also resolve citation counts
    pub fn with_citations(mut self, include: bool) -> Self {
        self.include_citations = include;
        self
    }

    /// Parse one raw unit
    pub fn parse(&self, unit: &RawUnit) -> Result<PublicationRecord, ParseError> {
        match unit {
            RawUnit::Structured(value) => self.parse_structured(value),
            RawUnit::Markup(markup) => self.parse_markup(markup),
        }
    }

    fn parse_structured(&self, value: &Value) -> Result<PublicationRecord, ParseError> {
        let obj = value
            .as_object()
            .ok_or_else(|| ParseError::NotAnObject(json_type_name(value)))?;

        Ok(PublicationRecord {
            title: resolve_text(obj, &self.keys.title),
            authors: single(resolve_authors(obj, &self.keys.authors)),
            venue: resolve_text(obj, &self.keys.venue),
            year: resolve_text(obj, &self.keys.year),
            r#abstract: String::new(),
            citations: if self.include_citations {
                resolve_count(obj, &self.keys.citations)
            } else {
                None
            },
        })
    }

    fn parse_markup(&self, markup: &str) -> Result<PublicationRecord, ParseError> {
        let row = self.selectors.extract(markup)?;

        Ok(PublicationRecord {
            title: row.title,
            authors: single(row.authors),
            venue: row.venue,
            year: row.year,
            r#abstract: String::new(),
            citations: row.citations.filter(|_| self.include_citations),
        })
    }
}

fn single(text: String) -> Vec<String> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![text]
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
