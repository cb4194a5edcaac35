//! Acquisition strategies with a shared trait-based interface.
//!
//! This module defines the [`Source`] trait that every acquisition strategy
//! implements. The pipeline only talks to `dyn Source`; the concrete strategy
//! is chosen once, at construction, by [`connect_source`].
//!
//! # Strategies
//!
//! - `api` - [`AuthorApiSource`]: structured author/citation JSON client
//! - `browser` - [`BrowserSource`]: headless browser over WebDriver, with
//!   lazy-load scrolling and overlay-based abstract extraction
//! - `html` - [`ProfilePageSource`]: static profile pages over HTTP, paginated
//!
//! # Failure model
//!
//! `list_publications` failing is fatal for the run. `fetch_abstract` failing
//! only affects the one publication. Zero publications is not an error: it is
//! logged, because an empty profile and a challenged request look the same.

mod api;
mod browser;
mod profile_page;
mod registry;
mod webdriver;

pub mod mock;

pub use api::AuthorApiSource;
pub use browser::{BrowserDriver, BrowserSource, ScrollSettings};
pub use mock::MockSource;
pub use profile_page::ProfilePageSource;
pub use registry::{connect_source, SourceCapabilities, SourceKind};
pub use webdriver::WebDriverSession;

use crate::models::AcquisitionResult;
use async_trait::async_trait;

/// The Source trait defines the interface for all acquisition strategies.
///
/// Methods take `&mut self`: a strategy may own an exclusive session (the
/// browser page) that must not be driven from two steps at once.
#[async_trait]
pub trait Source: Send + std::fmt::Debug {
    /// Unique identifier for this strategy ("api", "browser", "html", ...)
    fn id(&self) -> &str;

    /// Human-readable name of this strategy
    fn name(&self) -> &str;

    /// Describe the capabilities of this strategy
    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::LIST
    }

    /// Whether this strategy can fetch abstracts
    fn supports_abstracts(&self) -> bool {
        self.capabilities().contains(SourceCapabilities::ABSTRACTS)
    }

    /// Obtain raw content for the full publication list
    async fn list_publications(&mut self) -> Result<AcquisitionResult, SourceError>;

    /// Fetch the extended abstract of the publication at `index` in the last
    /// listing
    async fn fetch_abstract(&mut self, _index: usize) -> Result<String, SourceError> {
        Err(SourceError::NotImplemented)
    }

    /// Release any session resources held by the strategy
    async fn shutdown(&mut self) -> Result<(), SourceError> {
        Ok(())
    }
}

/// Errors that can occur while acquiring content
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The requested operation is not implemented for this strategy
    #[error("Operation not implemented for this source")]
    NotImplemented,

    /// Network or HTTP transport error
    #[error("Network error: {0}")]
    Network(String),

    /// A bounded wait expired
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Parsing error (JSON, HTML, etc.)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// The remote service rejected or challenged the request
    #[error("Request blocked: {0}")]
    Blocked(String),

    /// Author or publication not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Server-side failure (5xx)
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// API error from the remote service
    #[error("API error: {0}")]
    Api(String),

    /// Browser automation error
    #[error("Browser error: {0}")]
    Browser(String),

    /// Missing or invalid configuration for this strategy
    #[error("Configuration error: {0}")]
    Config(String),

    /// No publication at the given index in the last listing
    #[error("No publication at index {0}")]
    IndexOutOfRange(usize),
}

impl SourceError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SourceError::Network(_)
                | SourceError::Timeout(_)
                | SourceError::RateLimit
                | SourceError::Blocked(_)
                | SourceError::Server { .. }
        )
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout(err.to_string())
        } else if err.is_decode() {
            SourceError::Parse(err.to_string())
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}
