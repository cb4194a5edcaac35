//! Static profile page strategy.
//!
//! Fetches the public profile listing over plain HTTP, page by page
//! (`cstart`/`pagesize`), and yields each publication row as markup. Abstracts
//! come from the row's detail page.

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::config::Config;
use crate::models::AcquisitionResult;
use crate::parser::{compile_all, element_text, CompiledSelectors};
use crate::sources::{Source, SourceCapabilities, SourceError};
use crate::utils::{with_retry, HttpClient, RetryConfig};

/// Static profile page source
#[derive(Debug)]
pub struct ProfilePageSource {
    client: HttpClient,
    profile_url: url::Url,
    page_size: usize,
    max_pages: usize,
    retry: RetryConfig,
    row: Selector,
    abstract_selectors: Vec<Selector>,
    selectors: CompiledSelectors,
    rows: Vec<String>,
}

impl ProfilePageSource {
    pub fn new(config: &Config) -> Result<Self, SourceError> {
        let profile_url = config
            .profile
            .profile_url()
            .map_err(|e| SourceError::Config(e.to_string()))?;

        let row = Selector::parse(&config.markup.row).map_err(|e| {
            SourceError::Config(format!("markup.row {}: {:?}", config.markup.row, e))
        })?;
        let abstract_selectors = compile_all(&[config.markup.abstract_text.clone()])
            .map_err(|e| SourceError::Config(e.to_string()))?;
        let selectors = CompiledSelectors::compile(&config.markup)
            .map_err(|e| SourceError::Config(e.to_string()))?;

        Ok(Self {
            client: HttpClient::new(&config.http)?,
            profile_url,
            page_size: config.http.page_size.clamp(1, 100),
            max_pages: config.http.max_pages.max(1),
            retry: RetryConfig::from(&config.retry),
            row,
            abstract_selectors,
            selectors,
            rows: Vec::new(),
        })
    }

    fn page_url(&self, start: usize) -> String {
        let mut url = self.profile_url.clone();
        url.query_pairs_mut()
            .append_pair("cstart", &start.to_string())
            .append_pair("pagesize", &self.page_size.to_string());
        url.into()
    }

    async fn get_page(&self, url: &str, what: &str) -> Result<String, SourceError> {
        let client = self.client.clone();
        let url = url.to_string();

        with_retry(self.retry, what, || {
            let client = client.clone();
            let url = url.clone();
            async move { client.get_text(&url).await }
        })
        .await
    }

    fn extract_rows(&self, page: &str) -> Vec<String> {
        let document = Html::parse_document(page);
        document.select(&self.row).map(|row| row.html()).collect()
    }

    fn extract_abstract(&self, page: &str) -> String {
        let document = Html::parse_document(page);
        self.abstract_selectors
            .iter()
            .filter_map(|selector| document.select(selector).next())
            .map(element_text)
            .find(|text| !text.is_empty())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Source for ProfilePageSource {
    fn id(&self) -> &str {
        "html"
    }

    fn name(&self) -> &str {
        "Scholar profile pages"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::LIST | SourceCapabilities::ABSTRACTS | SourceCapabilities::CITATION_COUNTS
    }

    async fn list_publications(&mut self) -> Result<AcquisitionResult, SourceError> {
        let mut rows = Vec::new();

        for page in 0..self.max_pages {
            let url = self.page_url(page * self.page_size);
            let body = self.get_page(&url, "profile page").await?;
            let page_rows = self.extract_rows(&body);
            let count = page_rows.len();

            tracing::debug!("Profile page {} returned {} rows", page + 1, count);
            rows.extend(page_rows);

            if count < self.page_size {
                break;
            }
        }

        if rows.is_empty() {
            tracing::warn!(
                "No publication rows found at {}; the profile may be empty or the request was challenged",
                self.profile_url
            );
        }

        self.rows = rows.clone();
        Ok(AcquisitionResult::Markup(rows))
    }

    async fn fetch_abstract(&mut self, index: usize) -> Result<String, SourceError> {
        let row = self
            .rows
            .get(index)
            .ok_or(SourceError::IndexOutOfRange(index))?;

        let link = self
            .selectors
            .link(row)
            .ok_or_else(|| SourceError::Parse(format!("row {} has no detail link", index)))?;
        let url = self
            .profile_url
            .join(&link)
            .map_err(|e| SourceError::Parse(format!("detail link {}: {}", link, e)))?;

        let page = self.get_page(url.as_str(), "publication detail").await?;
        Ok(self.extract_abstract(&page))
    }
}
