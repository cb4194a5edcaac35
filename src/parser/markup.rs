//! Field extraction from one rendered publication row.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use super::ParseError;

/// CSS selector fallback lists per logical field, applied within one row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupSelectors {
    #[serde(default = "default_title_selectors")]
    pub title: Vec<String>,

    #[serde(default = "default_author_selectors")]
    pub authors: Vec<String>,

    #[serde(default = "default_venue_selectors")]
    pub venue: Vec<String>,

    #[serde(default = "default_year_selectors")]
    pub year: Vec<String>,

    #[serde(default = "default_citation_selectors")]
    pub citations: Vec<String>,

    /// Element whose `href` leads to the publication detail view
    #[serde(default = "default_title_selectors")]
    pub link: Vec<String>,

    /// One publication row on the rendered profile page
    #[serde(default = "default_row_selector")]
    pub row: String,

    /// Element holding the abstract on a detail page or overlay
    #[serde(default = "default_abstract_selector")]
    pub abstract_text: String,
}

impl Default for MarkupSelectors {
    fn default() -> Self {
        Self {
            title: default_title_selectors(),
            authors: default_author_selectors(),
            venue: default_venue_selectors(),
            year: default_year_selectors(),
            citations: default_citation_selectors(),
            link: default_title_selectors(),
            row: default_row_selector(),
            abstract_text: default_abstract_selector(),
        }
    }
}

impl MarkupSelectors {
    /// Compile every selector once to surface syntax errors early
    pub fn check(&self) -> Result<(), ParseError> {
        CompiledSelectors::compile(self)?;
        compile_all(&[self.row.clone(), self.abstract_text.clone()])?;
        Ok(())
    }
}

fn selectors(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn default_title_selectors() -> Vec<String> {
    selectors(&["td.gsc_a_t a.gsc_a_at", "a.gsc_a_at", ".gs_rt a"])
}

fn default_author_selectors() -> Vec<String> {
    selectors(&["td.gsc_a_t div.gs_gray:nth-of-type(1)", ".gs_a"])
}

fn default_venue_selectors() -> Vec<String> {
    selectors(&["td.gsc_a_t div.gs_gray:nth-of-type(2)"])
}

fn default_year_selectors() -> Vec<String> {
    selectors(&["td.gsc_a_y span.gsc_a_h", "td.gsc_a_y"])
}

fn default_citation_selectors() -> Vec<String> {
    selectors(&["td.gsc_a_c a.gsc_a_ac"])
}

fn default_row_selector() -> String {
    "tr.gsc_a_tr".to_string()
}

fn default_abstract_selector() -> String {
    "#gsc_oci_descr".to_string()
}

/// Field values found in one row; absent fields are empty
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFields {
    pub title: String,
    pub authors: String,
    pub venue: String,
    pub year: String,
    pub citations: Option<u32>,
    pub link: Option<String>,
}

impl RowFields {
    fn is_unrecognized(&self) -> bool {
        self.title.is_empty()
            && self.authors.is_empty()
            && self.venue.is_empty()
            && self.year.is_empty()
    }
}

/// [`MarkupSelectors`] compiled once for reuse across rows
#[derive(Debug, Clone)]
pub struct CompiledSelectors {
    title: Vec<Selector>,
    authors: Vec<Selector>,
    venue: Vec<Selector>,
    year: Vec<Selector>,
    citations: Vec<Selector>,
    link: Vec<Selector>,
}

impl CompiledSelectors {
    pub fn compile(selectors: &MarkupSelectors) -> Result<Self, ParseError> {
        Ok(Self {
            title: compile_all(&selectors.title)?,
            authors: compile_all(&selectors.authors)?,
            venue: compile_all(&selectors.venue)?,
            year: compile_all(&selectors.year)?,
            citations: compile_all(&selectors.citations)?,
            link: compile_all(&selectors.link)?,
        })
    }

    /// Extract the row fields, failing only if nothing recognizable is found
    pub fn extract(&self, markup: &str) -> Result<RowFields, ParseError> {
        let fragment = parse_row_fragment(markup);
        let root = fragment.root_element();

        let fields = RowFields {
            title: first_text(root, &self.title),
            authors: first_text(root, &self.authors),
            venue: first_text(root, &self.venue),
            year: first_text(root, &self.year),
            citations: {
                let text = first_text(root, &self.citations);
                let digits: String = text.chars().filter(char::is_ascii_digit).collect();
                digits.parse().ok()
            },
            link: first_attr(root, &self.link, "href"),
        };

        if fields.is_unrecognized() {
            return Err(ParseError::UnrecognizedMarkup(preview(markup)));
        }
        Ok(fields)
    }

    /// The detail-view link of a row, if any
    pub fn link(&self, markup: &str) -> Option<String> {
        let fragment = parse_row_fragment(markup);
        first_attr(fragment.root_element(), &self.link, "href")
    }
}

pub(crate) fn compile_all(sources: &[String]) -> Result<Vec<Selector>, ParseError> {
    sources
        .iter()
        .map(|source| {
            Selector::parse(source)
                .map_err(|e| ParseError::InvalidSelector(format!("{}: {:?}", source, e)))
        })
        .collect()
}

/// Parse a row as a fragment; table rows are wrapped so the HTML parser keeps
/// their `tr`/`td` structure
fn parse_row_fragment(markup: &str) -> Html {
    let trimmed = markup.trim_start();
    let is_table_row = trimmed
        .get(..3)
        .is_some_and(|head| head.eq_ignore_ascii_case("<tr"));

    if is_table_row {
        Html::parse_fragment(&format!("<table><tbody>{}</tbody></table>", markup))
    } else {
        Html::parse_fragment(markup)
    }
}

/// Whitespace-collapsed text of an element
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(root: ElementRef<'_>, selectors: &[Selector]) -> String {
    selectors
        .iter()
        .filter_map(|selector| root.select(selector).next())
        .map(element_text)
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

fn first_attr(root: ElementRef<'_>, selectors: &[Selector], attr: &str) -> Option<String> {
    selectors
        .iter()
        .filter_map(|selector| root.select(selector).next())
        .find_map(|element| element.value().attr(attr))
        .map(str::to_string)
}

fn preview(markup: &str) -> String {
    let flat: String = markup.split_whitespace().collect::<Vec<_>>().join(" ");
    flat.chars().take(80).collect()
}
