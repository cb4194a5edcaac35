//! Field normalization for authors, venues and years.
//!
//! All functions here are pure and total: malformed input degrades to an
//! empty value, never to an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static AND_OR_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*(?:[,;]|\band\b)\s*").expect("static regex"));

static AND_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\band\b\s*").expect("static regex"));

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("static regex"));

/// Characters trimmed from both ends of a venue
const VENUE_TRIM_PUNCTUATION: &[char] = &[',', ';', ':', '-', '–', '—', '|', '/', '·', '•'];

/// Space-like characters that upstream markup uses in place of a plain space
const NBSP_CHARS: &[char] = &['\u{00a0}', '\u{202f}', '\u{2007}'];

/// How an author string is split into names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorSplit {
    /// Split on commas, semicolons and the word "and"
    #[default]
    AndAndComma,
    /// Split only on the word "and"; commas stay inside names ("Smith, J.")
    AndOnly,
}

/// Split an author string into an ordered list of names
///
/// Elements are trimmed; empty elements and the ellipsis that ends a
/// truncated author list are dropped.
pub fn normalize_authors(raw: &str, split: AuthorSplit) -> Vec<String> {
    let delimiters: &Regex = match split {
        AuthorSplit::AndAndComma => &AND_OR_COMMA,
        AuthorSplit::AndOnly => &AND_ONLY,
    };

    delimiters
        .split(raw)
        .map(str::trim)
        .filter(|name| !name.is_empty() && !is_ellipsis(name))
        .map(str::to_string)
        .collect()
}

fn is_ellipsis(s: &str) -> bool {
    s.chars().all(|c| c == '.' || c == '…')
}

/// Clean a venue string
///
/// Non-breaking spaces become plain spaces, repeated whitespace collapses,
/// leading and trailing punctuation is trimmed and, when `year` is known,
/// trailing `", <year>"` repeats are stripped. The result is a fixpoint:
/// normalizing it again returns it unchanged.
pub fn normalize_venue(raw: &str, year: &str) -> String {
    let mut venue = collapse_whitespace(&raw.replace(NBSP_CHARS, " "));
    let year = year.trim();

    loop {
        let before = venue.clone();
        venue = trim_venue_punctuation(&venue).to_string();
        if !year.is_empty() {
            venue = strip_trailing_year(&venue, year);
        }
        if venue == before {
            return venue;
        }
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn trim_venue_punctuation(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_whitespace() || VENUE_TRIM_PUNCTUATION.contains(&c))
}

/// Strip one or more trailing occurrences of `year`, with their separators
fn strip_trailing_year(venue: &str, year: &str) -> String {
    let mut rest = venue.trim_end();

    while let Some(head) = rest.strip_suffix(year) {
        // "Conf 12020" does not end with the year 2020
        if head.chars().last().is_some_and(char::is_alphanumeric) {
            break;
        }
        rest = head.trim_end_matches(|c: char| c.is_whitespace() || c == ',');
    }

    rest.to_string()
}

/// Extract the first run of exactly four digits, or empty text if none
pub fn normalize_year(raw: &str) -> String {
    DIGIT_RUN
        .find_iter(raw)
        .map(|m| m.as_str())
        .find(|run| run.len() == 4)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_authors_mixed_delimiters() {
        assert_eq!(
            normalize_authors("A. Smith and B. Jones, C. Lee", AuthorSplit::AndAndComma),
            vec!["A. Smith", "B. Jones", "C. Lee"]
        );
    }

    #[test]
    fn test_normalize_authors_and_only_keeps_commas() {
        assert_eq!(
            normalize_authors("Smith, John and Jones, Bea", AuthorSplit::AndOnly),
            vec!["Smith, John", "Jones, Bea"]
        );
    }

    #[test]
    fn test_normalize_authors_drops_empty_and_ellipsis() {
        assert_eq!(
            normalize_authors("A Smith, , B Jones, ...", AuthorSplit::AndAndComma),
            vec!["A Smith", "B Jones"]
        );
        assert_eq!(
            normalize_authors("X Y, and Z W", AuthorSplit::AndAndComma),
            vec!["X Y", "Z W"]
        );
        assert!(normalize_authors("", AuthorSplit::AndAndComma).is_empty());
        assert!(normalize_authors("   ", AuthorSplit::AndOnly).is_empty());
    }

    #[test]
    fn test_normalize_authors_does_not_split_inside_words() {
        assert_eq!(
            normalize_authors("R Anand and S Brandon", AuthorSplit::AndAndComma),
            vec!["R Anand", "S Brandon"]
        );
    }

    #[test]
    fn test_normalize_venue_strips_year() {
        let venue = normalize_venue("IEEE Trans. Computers, 2020", "2020");
        assert_eq!(venue, "IEEE Trans. Computers");
        assert_eq!(normalize_venue(&venue, "2020"), venue);
    }

    #[test]
    fn test_normalize_venue_nbsp_and_repeated_year() {
        let venue = normalize_venue("Foo Journal\u{00a0}2020 2020", "2020");
        assert_eq!(venue, "Foo Journal");
    }

    #[test]
    fn test_normalize_venue_without_year_keeps_digits() {
        assert_eq!(normalize_venue("Nature 577, 2020", ""), "Nature 577, 2020");
        assert_eq!(normalize_venue("Nature 577, 2020", "2020"), "Nature 577");
    }

    #[test]
    fn test_normalize_venue_does_not_cut_longer_numbers() {
        assert_eq!(normalize_venue("Report 12020", "2020"), "Report 12020");
    }

    #[test]
    fn test_normalize_venue_collapses_whitespace_and_punctuation() {
        assert_eq!(
            normalize_venue("  ,  Proc.   of   the ACM ;", ""),
            "Proc. of the ACM"
        );
    }

    #[test]
    fn test_normalize_venue_is_idempotent() {
        let inputs = [
            ("Foo, 2020,", "2020"),
            ("2020", "2020"),
            ("Conf 2019, 2019 ,  ", "2019"),
            ("- Workshop — ", ""),
            ("", "2021"),
            ("arXiv preprint arXiv:2101.00001, 2021", "2021"),
        ];

        for (raw, year) in inputs {
            let once = normalize_venue(raw, year);
            assert_eq!(normalize_venue(&once, year), once, "input {:?}", raw);
        }
    }

    #[test]
    fn test_normalize_year() {
        assert_eq!(normalize_year("pp. 12-20, 2019"), "2019");
        assert_eq!(normalize_year(""), "");
        assert_eq!(normalize_year("12345 and 2018"), "2018");
        assert_eq!(normalize_year("no year here"), "");
        assert_eq!(normalize_year("2021/5/4"), "2021");
    }
}
