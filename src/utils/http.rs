//! HTTP client utilities.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;

use crate::config::HttpConfig;
use crate::sources::SourceError;

/// Shared HTTP client with optional request pacing
#[derive(Clone)]
pub struct HttpClient {
    client: Arc<Client>,
    pacing: Option<Arc<DefaultDirectRateLimiter>>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("paced", &self.pacing.is_some())
            .finish()
    }
}

impl HttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &HttpConfig) -> Result<Self, SourceError> {
        let mut builder = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90));

        if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.is_empty()) {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| SourceError::Config(format!("invalid proxy {}: {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| SourceError::Config(format!("failed to create HTTP client: {}", e)))?;

        let pacing = Quota::with_period(Duration::from_millis(config.min_interval_ms))
            .map(|quota| Arc::new(RateLimiter::direct(quota)));

        Ok(Self {
            client: Arc::new(client),
            pacing,
        })
    }

    /// GET `url`, waiting for the pacing limiter first, and map error
    /// statuses onto [`SourceError`]
    pub async fn get_checked(&self, url: &str) -> Result<Response, SourceError> {
        if let Some(pacing) = &self.pacing {
            pacing.until_ready().await;
        }

        let response = self.client.get(url).send().await?;
        check_status(response).await
    }

    /// GET `url` and return the body as text
    pub async fn get_text(&self, url: &str) -> Result<String, SourceError> {
        Ok(self.get_checked(url).await?.text().await?)
    }
}

/// Map a non-success status onto the error taxonomy
pub async fn check_status(response: Response) -> Result<Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(200).collect();

    Err(match status {
        StatusCode::TOO_MANY_REQUESTS => SourceError::RateLimit,
        StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
            SourceError::Blocked(format!("{} returned {}", url, status))
        }
        StatusCode::NOT_FOUND => SourceError::NotFound(url),
        s if s.is_server_error() => SourceError::Server {
            status: s.as_u16(),
            message: snippet,
        },
        s => SourceError::Api(format!("{} returned {}: {}", url, s, snippet)),
    })
}
