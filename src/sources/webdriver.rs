//! [`BrowserDriver`] backed by a WebDriver session.

use async_trait::async_trait;
use fantoccini::{error::CmdError, wd::TimeoutConfiguration, Client, ClientBuilder, Locator};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::config::{BrowserConfig, BrowserKind};
use crate::sources::{BrowserDriver, SourceError};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// A live WebDriver session (chromedriver, geckodriver or a Selenium grid)
pub struct WebDriverSession {
    client: Client,
    endpoint: String,
}

impl std::fmt::Debug for WebDriverSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebDriverSession")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl WebDriverSession {
    /// Start a new browser session
    pub async fn connect(config: &BrowserConfig) -> Result<Self, SourceError> {
        let client = ClientBuilder::native()
            .capabilities(capabilities(config))
            .connect(&config.webdriver_url)
            .await
            .map_err(|e| {
                SourceError::Browser(format!(
                    "could not start a session at {}: {}",
                    config.webdriver_url, e
                ))
            })?;

        let page_load = Duration::from_secs(config.page_load_timeout_secs);
        if let Err(e) = client
            .update_timeouts(TimeoutConfiguration::new(None, Some(page_load), None))
            .await
        {
            tracing::debug!("WebDriver rejected the page load timeout: {}", e);
        }

        tracing::debug!("WebDriver session started at {}", config.webdriver_url);
        Ok(Self {
            client,
            endpoint: config.webdriver_url.clone(),
        })
    }

    async fn any_displayed(&self, selector: &str) -> Result<bool, SourceError> {
        for element in self.client.find_all(Locator::Css(selector)).await.map_err(browser_error)? {
            if element.is_displayed().await.unwrap_or(false) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Poll `selector` until its displayed state equals `displayed`
    async fn poll_displayed(
        &self,
        selector: &str,
        displayed: bool,
        timeout: Duration,
    ) -> Result<bool, SourceError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.any_displayed(selector).await? == displayed {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(POLL_INTERVAL).await;
        }
    }
}

fn capabilities(config: &BrowserConfig) -> Map<String, Value> {
    let mut caps = Map::new();
    match config.browser {
        BrowserKind::Chrome => {
            let mut args = vec!["--disable-gpu", "--no-sandbox", "--window-size=1280,2000"];
            if config.headless {
                args.push("--headless=new");
            }
            caps.insert("browserName".to_string(), json!("chrome"));
            caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
        }
        BrowserKind::Firefox => {
            let args: Vec<&str> = if config.headless { vec!["-headless"] } else { Vec::new() };
            caps.insert("browserName".to_string(), json!("firefox"));
            caps.insert("moz:firefoxOptions".to_string(), json!({ "args": args }));
        }
    }
    caps
}

fn browser_error(err: CmdError) -> SourceError {
    match err {
        CmdError::WaitTimeout => SourceError::Timeout("browser wait".to_string()),
        other => SourceError::Browser(other.to_string()),
    }
}

#[async_trait]
impl BrowserDriver for WebDriverSession {
    async fn goto(&mut self, url: &str) -> Result<(), SourceError> {
        self.client.goto(url).await.map_err(browser_error)
    }

    async fn scroll_height(&mut self) -> Result<u64, SourceError> {
        let value = self
            .client
            .execute("return document.body.scrollHeight;", Vec::new())
            .await
            .map_err(browser_error)?;
        Ok(value.as_u64().unwrap_or(0))
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), SourceError> {
        self.client
            .execute("window.scrollTo(0, document.body.scrollHeight);", Vec::new())
            .await
            .map_err(browser_error)?;
        Ok(())
    }

    async fn click_first_enabled(&mut self, selector: &str) -> Result<bool, SourceError> {
        let elements = self
            .client
            .find_all(Locator::Css(selector))
            .await
            .map_err(browser_error)?;

        for element in elements {
            let usable = element.is_displayed().await.unwrap_or(false)
                && element.is_enabled().await.unwrap_or(false);
            if usable {
                element.click().await.map_err(browser_error)?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<bool, SourceError> {
        self.poll_displayed(selector, true, timeout).await
    }

    async fn wait_gone(&mut self, selector: &str, timeout: Duration) -> Result<bool, SourceError> {
        self.poll_displayed(selector, false, timeout).await
    }

    async fn outer_html_all(&mut self, selector: &str) -> Result<Vec<String>, SourceError> {
        let elements = self
            .client
            .find_all(Locator::Css(selector))
            .await
            .map_err(browser_error)?;

        let mut html = Vec::with_capacity(elements.len());
        for element in elements {
            html.push(element.html(false).await.map_err(browser_error)?);
        }
        Ok(html)
    }

    async fn click_nth(&mut self, selector: &str, index: usize) -> Result<(), SourceError> {
        let elements = self
            .client
            .find_all(Locator::Css(selector))
            .await
            .map_err(browser_error)?;

        let element = elements
            .into_iter()
            .nth(index)
            .ok_or(SourceError::IndexOutOfRange(index))?;
        element.click().await.map_err(browser_error)
    }

    async fn text_of(&mut self, selector: &str) -> Result<Option<String>, SourceError> {
        let elements = self
            .client
            .find_all(Locator::Css(selector))
            .await
            .map_err(browser_error)?;

        match elements.into_iter().next() {
            Some(element) => Ok(Some(element.text().await.map_err(browser_error)?)),
            None => Ok(None),
        }
    }

    async fn quit(&mut self) -> Result<(), SourceError> {
        self.client.clone().close().await.map_err(browser_error)
    }
}
