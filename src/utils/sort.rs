//! Stable ordering of records by year, newest first.

use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};

use super::normalize::normalize_year;
use crate::models::PublicationRecord;

/// Where records without a usable year are placed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownYear {
    /// After every dated record
    #[default]
    Last,
    /// Before every dated record
    First,
}

/// Numeric sort key of a year field; `0000` counts as unknown
pub fn year_key(year: &str) -> Option<u16> {
    normalize_year(year).parse().ok().filter(|y| *y > 0)
}

/// Sort records by year descending
///
/// The sort is stable: records with equal keys keep their relative order.
pub fn sort_by_year_desc(records: &mut [PublicationRecord], unknown: UnknownYear) {
    records.sort_by(|a, b| compare_years(year_key(&a.year), year_key(&b.year), unknown));
}

fn compare_years(a: Option<u16>, b: Option<u16>, unknown: UnknownYear) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => Reverse(a).cmp(&Reverse(b)),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => match unknown {
            UnknownYear::Last => Ordering::Greater,
            UnknownYear::First => Ordering::Less,
        },
        (Some(_), None) => match unknown {
            UnknownYear::Last => Ordering::Less,
            UnknownYear::First => Ordering::Greater,
        },
    }
}
