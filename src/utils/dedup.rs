//! Deduplication of publication records.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use strsim::jaro_winkler;

use crate::models::PublicationRecord;

/// Which occurrence of a duplicate group survives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateStrategy {
    /// Keep the first occurrence of each duplicate group
    #[default]
    First,
    /// Keep the last occurrence of each duplicate group
    Last,
}

/// Find duplicate records based on title similarity and year
///
/// Returns groups of record indices, in ascending order, that are duplicates
/// of each other.
pub fn find_duplicates(records: &[PublicationRecord], threshold: f64) -> Vec<Vec<usize>> {
    let titles: Vec<String> = records.iter().map(|r| normalize_title(&r.title)).collect();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut processed: HashSet<usize> = HashSet::new();

    for i in 0..records.len() {
        if processed.contains(&i) || titles[i].is_empty() {
            continue;
        }

        let mut group = vec![i];

        for j in (i + 1)..records.len() {
            if processed.contains(&j) || titles[j].is_empty() {
                continue;
            }

            if years_compatible(&records[i], &records[j])
                && jaro_winkler(&titles[i], &titles[j]) >= threshold
            {
                group.push(j);
                processed.insert(j);
            }
        }

        if group.len() > 1 {
            groups.push(group);
        }

        processed.insert(i);
    }

    groups
}

/// Years agree, or at least one of them is unknown
fn years_compatible(a: &PublicationRecord, b: &PublicationRecord) -> bool {
    a.year.is_empty() || b.year.is_empty() || a.year == b.year
}

/// Lowercase alphanumeric words of a title
fn normalize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Remove duplicate records, preserving the relative order of survivors
///
/// Returns the surviving records and the number removed.
pub fn deduplicate_records(
    records: Vec<PublicationRecord>,
    strategy: DuplicateStrategy,
    threshold: f64,
) -> (Vec<PublicationRecord>, usize) {
    let groups = find_duplicates(&records, threshold);

    if groups.is_empty() {
        return (records, 0);
    }

    let mut to_remove: HashSet<usize> = HashSet::new();

    for group in groups {
        let keep = match strategy {
            DuplicateStrategy::First => group[0],
            DuplicateStrategy::Last => group[group.len() - 1],
        };
        to_remove.extend(group.into_iter().filter(|idx| *idx != keep));
    }

    let removed = to_remove.len();
    let survivors = records
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !to_remove.contains(i))
        .map(|(_, r)| r)
        .collect();

    (survivors, removed)
}
