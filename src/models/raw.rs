//! Raw content handed from an acquisition strategy to the record parser.

use serde_json::Value;

/// One unparsed publication entry as obtained from the source
#[derive(Debug, Clone, PartialEq)]
pub enum RawUnit {
    /// A structured object from an API response
    Structured(Value),
    /// One opaque markup block (a rendered publication row)
    Markup(String),
}

impl RawUnit {
    /// Short label used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            RawUnit::Structured(_) => "structured",
            RawUnit::Markup(_) => "markup",
        }
    }
}

/// Raw content for the full publication list, in source-encountered order
///
/// Each unit corresponds 1:1 to one future publication record.
#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionResult {
    Structured(Vec<Value>),
    Markup(Vec<String>),
}

impl AcquisitionResult {
    /// An empty result; zero publications is a valid outcome
    pub fn empty() -> Self {
        AcquisitionResult::Structured(Vec::new())
    }

    pub fn len(&self) -> usize {
        match self {
            AcquisitionResult::Structured(units) => units.len(),
            AcquisitionResult::Markup(units) => units.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten into individual raw units, preserving order
    pub fn into_units(self) -> Vec<RawUnit> {
        match self {
            AcquisitionResult::Structured(units) => {
                units.into_iter().map(RawUnit::Structured).collect()
            }
            AcquisitionResult::Markup(units) => units.into_iter().map(RawUnit::Markup).collect(),
        }
    }
}
