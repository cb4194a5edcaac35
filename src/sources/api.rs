//! Structured author API strategy.
//!
//! Talks to a Google Scholar author API that returns JSON (SerpApi's
//! `google_scholar_author` engine). The author lookup pages through the
//! author's articles; each article is then expanded with its citation detail
//! object.
//!
//! API documentation: https://serpapi.com/google-scholar-author-api

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::config::Config;
use crate::models::AcquisitionResult;
use crate::parser::resolve_text;
use crate::sources::{Source, SourceCapabilities, SourceError};
use crate::utils::{with_retry, HttpClient, RetryConfig};

const AUTHOR_ENGINE: &str = "google_scholar_author";

/// What is remembered about each listed article for later enrichment
#[derive(Debug, Clone, Default)]
struct ListedArticle {
    citation_id: Option<String>,
    abstract_text: Option<String>,
    detail_fetched: bool,
}

/// Structured author API source
pub struct AuthorApiSource {
    client: HttpClient,
    base_url: String,
    api_key: String,
    author_id: String,
    language: Option<String>,
    page_size: usize,
    max_pages: usize,
    fetch_details: bool,
    retry: RetryConfig,
    abstract_keys: Vec<String>,
    listing: Vec<ListedArticle>,
}

impl std::fmt::Debug for AuthorApiSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorApiSource")
            .field("base_url", &self.base_url)
            .field("author_id", &self.author_id)
            .field("fetch_details", &self.fetch_details)
            .field("listed", &self.listing.len())
            .finish()
    }
}

impl AuthorApiSource {
    pub fn new(config: &Config) -> Result<Self, SourceError> {
        let api_key = config.api.resolved_api_key().ok_or_else(|| {
            SourceError::Config(
                "api mode needs api.api_key or the SERPAPI_API_KEY environment variable"
                    .to_string(),
            )
        })?;

        Ok(Self {
            client: HttpClient::new(&config.http)?,
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            api_key,
            author_id: config.profile.author_id.trim().to_string(),
            language: config.profile.language.clone(),
            page_size: config.api.page_size.clamp(1, 100),
            max_pages: config.api.max_pages.max(1),
            fetch_details: config.api.fetch_details,
            retry: RetryConfig::from(&config.retry),
            abstract_keys: config.fields.abstract_text.clone(),
            listing: Vec::new(),
        })
    }

    fn search_url(&self, params: &[(&str, String)]) -> Result<String, SourceError> {
        let mut all: Vec<(&str, String)> = vec![
            ("engine", AUTHOR_ENGINE.to_string()),
            ("api_key", self.api_key.clone()),
        ];
        if let Some(language) = &self.language {
            all.push(("hl", language.clone()));
        }
        all.extend(params.iter().cloned());

        url::Url::parse_with_params(&format!("{}/search.json", self.base_url), &all)
            .map(String::from)
            .map_err(|e| SourceError::Config(format!("api.base_url: {}", e)))
    }

    /// GET a JSON document with retries, surfacing in-body API errors
    async fn get_json(&self, url: &str, what: &str) -> Result<Value, SourceError> {
        let client = self.client.clone();
        let url = url.to_string();

        let body = with_retry(self.retry, what, || {
            let client = client.clone();
            let url = url.clone();
            async move {
                let body: Value = client.get_checked(&url).await?.json().await?;
                match api_error(&body) {
                    Some(error) => Err(error),
                    None => Ok(body),
                }
            }
        })
        .await?;

        Ok(body)
    }

    /// Resolve the author and collect every article summary
    async fn fetch_author_articles(&self) -> Result<Vec<Value>, SourceError> {
        let mut articles = Vec::new();

        for page in 0..self.max_pages {
            let start = page * self.page_size;
            let url = self.search_url(&[
                ("author_id", self.author_id.clone()),
                ("start", start.to_string()),
                ("num", self.page_size.to_string()),
            ])?;

            let body = match self.get_json(&url, "author lookup").await {
                Ok(body) => body,
                // Past the first page the author is known; no results means the list ended
                Err(SourceError::NotFound(message)) if page > 0 => {
                    tracing::debug!("Author page {} is empty ({}); stopping", page + 1, message);
                    break;
                }
                Err(e) => return Err(e),
            };

            if page == 0 && !body.get("author").is_some_and(Value::is_object) {
                return Err(SourceError::NotFound(format!("author {}", self.author_id)));
            }

            let page_articles = body
                .get("articles")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let count = page_articles.len();
            articles.extend(page_articles);

            tracing::debug!("Author page {} returned {} articles", page + 1, count);

            let has_next = body.pointer("/serpapi_pagination/next").is_some();
            if !has_next || count < self.page_size {
                break;
            }
        }

        Ok(articles)
    }

    /// Fetch the citation detail object of one article
    async fn fetch_detail(&self, citation_id: &str) -> Result<Map<String, Value>, SourceError> {
        let url = self.search_url(&[
            ("view_op", "view_citation".to_string()),
            ("citation_id", citation_id.to_string()),
        ])?;

        let body = self.get_json(&url, "publication detail").await?;

        body.get("citation")
            .and_then(Value::as_object)
            .cloned()
            .ok_or_else(|| SourceError::Parse(format!("no citation object for {}", citation_id)))
    }

    fn abstract_of(&self, obj: &Map<String, Value>) -> Option<String> {
        let text = resolve_text(obj, &self.abstract_keys);
        (!text.is_empty()).then_some(text)
    }
}

/// Map an `error` field in a response body onto the error taxonomy
fn api_error(body: &Value) -> Option<SourceError> {
    let message = body.get("error")?.as_str()?.to_string();
    let lower = message.to_lowercase();

    Some(if lower.contains("api key") {
        SourceError::Config(message)
    } else if lower.contains("limit") || lower.contains("run out of searches") {
        SourceError::RateLimit
    } else if lower.contains("results") || lower.contains("not found") {
        SourceError::NotFound(message)
    } else {
        SourceError::Api(message)
    })
}

/// Detail keys win; summary keys fill the gaps
fn merge_detail(summary: Value, detail: Map<String, Value>) -> Value {
    let mut merged = match summary {
        Value::Object(obj) => obj,
        _ => Map::new(),
    };
    for (key, value) in detail {
        if !value.is_null() {
            merged.insert(key, value);
        }
    }
    Value::Object(merged)
}

#[async_trait]
impl Source for AuthorApiSource {
    fn id(&self) -> &str {
        "api"
    }

    fn name(&self) -> &str {
        "Scholar author API"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::LIST | SourceCapabilities::ABSTRACTS | SourceCapabilities::CITATION_COUNTS
    }

    async fn list_publications(&mut self) -> Result<AcquisitionResult, SourceError> {
        let summaries = self.fetch_author_articles().await?;
        tracing::info!(
            "Author {} lists {} publications",
            self.author_id,
            summaries.len()
        );

        let mut units = Vec::with_capacity(summaries.len());
        let mut listing = Vec::with_capacity(summaries.len());

        for (index, summary) in summaries.into_iter().enumerate() {
            let citation_id = summary
                .get("citation_id")
                .and_then(Value::as_str)
                .map(str::to_string);

            let mut entry = ListedArticle {
                citation_id: citation_id.clone(),
                ..ListedArticle::default()
            };

            let unit = match (&citation_id, self.fetch_details) {
                (Some(id), true) => match self.fetch_detail(id).await {
                    Ok(detail) => {
                        entry.abstract_text = self.abstract_of(&detail);
                        entry.detail_fetched = true;
                        merge_detail(summary, detail)
                    }
                    Err(e) => {
                        tracing::warn!("Skipping publication {}: detail fetch failed: {}", index, e);
                        continue;
                    }
                },
                _ => summary,
            };

            listing.push(entry);
            units.push(unit);
        }

        if units.is_empty() {
            tracing::warn!(
                "No publications found for author {}; the profile may be empty or the request was challenged",
                self.author_id
            );
        }

        self.listing = listing;
        Ok(AcquisitionResult::Structured(units))
    }

    async fn fetch_abstract(&mut self, index: usize) -> Result<String, SourceError> {
        let entry = self
            .listing
            .get(index)
            .cloned()
            .ok_or(SourceError::IndexOutOfRange(index))?;

        if let Some(text) = entry.abstract_text {
            return Ok(text);
        }

        let citation_id = match (entry.detail_fetched, entry.citation_id) {
            (false, Some(id)) => id,
            _ => return Ok(String::new()),
        };

        let detail = self.fetch_detail(&citation_id).await?;
        let text = self.abstract_of(&detail).unwrap_or_default();

        if let Some(slot) = self.listing.get_mut(index) {
            slot.detail_fetched = true;
            slot.abstract_text = Some(text.clone());
        }
        Ok(text)
    }
}
