//! Headless browser strategy.
//!
//! Renders the profile page, scrolls until the lazily loaded list stops
//! growing, then yields each publication row as markup. Abstracts are read by
//! opening a row's detail overlay, one overlay at a time.
//!
//! The page is driven through [`BrowserDriver`] so the scrolling and overlay
//! protocol can run against a scripted driver in tests.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::{BrowserSelectors, Config};
use crate::models::AcquisitionResult;
use crate::sources::{Source, SourceCapabilities, SourceError};

/// Primitive page operations the browser strategy needs
#[async_trait]
pub trait BrowserDriver: Send + std::fmt::Debug {
    /// Navigate to `url` and wait for the document to load
    async fn goto(&mut self, url: &str) -> Result<(), SourceError>;

    /// Current scrollable height of the document
    async fn scroll_height(&mut self) -> Result<u64, SourceError>;

    /// Scroll to the bottom of the document
    async fn scroll_to_bottom(&mut self) -> Result<(), SourceError>;

    /// Click the first displayed and enabled match; false if there is none
    async fn click_first_enabled(&mut self, selector: &str) -> Result<bool, SourceError>;

    /// Wait until `selector` is displayed; false on timeout
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<bool, SourceError>;

    /// Wait until nothing matching `selector` is displayed; false on timeout
    async fn wait_gone(&mut self, selector: &str, timeout: Duration) -> Result<bool, SourceError>;

    /// Outer HTML of every match, in document order
    async fn outer_html_all(&mut self, selector: &str) -> Result<Vec<String>, SourceError>;

    /// Click the `index`-th match
    async fn click_nth(&mut self, selector: &str, index: usize) -> Result<(), SourceError>;

    /// Text of the first match, if any
    async fn text_of(&mut self, selector: &str) -> Result<Option<String>, SourceError>;

    /// End the session
    async fn quit(&mut self) -> Result<(), SourceError>;
}

/// Lazy-load scrolling limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollSettings {
    pub max_scrolls: u32,
    pub stable_checks: u32,
    pub pause: Duration,
}

impl ScrollSettings {
    pub fn from_config(config: &crate::config::BrowserConfig) -> Self {
        Self {
            max_scrolls: config.max_scrolls,
            stable_checks: config.stable_checks.max(1),
            pause: Duration::from_millis(config.scroll_pause_ms),
        }
    }
}

/// Browser-rendered profile source
#[derive(Debug)]
pub struct BrowserSource {
    driver: Box<dyn BrowserDriver>,
    profile_url: String,
    selectors: BrowserSelectors,
    row: String,
    abstract_selector: String,
    scroll: ScrollSettings,
    page_load_timeout: Duration,
    list_timeout: Duration,
    overlay_timeout: Duration,
    row_count: usize,
    needs_reload: bool,
}

impl BrowserSource {
    pub fn new(driver: Box<dyn BrowserDriver>, config: &Config) -> Result<Self, SourceError> {
        let profile_url = config
            .profile
            .profile_url()
            .map_err(|e| SourceError::Config(e.to_string()))?;

        Ok(Self {
            driver,
            profile_url: profile_url.into(),
            selectors: config.browser.selectors.clone(),
            row: config.markup.row.clone(),
            abstract_selector: config.markup.abstract_text.clone(),
            scroll: ScrollSettings::from_config(&config.browser),
            page_load_timeout: Duration::from_secs(config.browser.page_load_timeout_secs),
            list_timeout: Duration::from_secs(config.browser.list_timeout_secs),
            overlay_timeout: Duration::from_secs(config.browser.overlay_timeout_secs),
            row_count: 0,
            needs_reload: false,
        })
    }

    /// Scroll until the height is unchanged for `stable_checks` consecutive
    /// checks or `max_scrolls` is reached. Returns the scrolls performed.
    async fn scroll_until_stable(&mut self) -> Result<u32, SourceError> {
        let mut last_height = self.driver.scroll_height().await?;
        let mut unchanged = 0;
        let mut scrolls = 0;

        while scrolls < self.scroll.max_scrolls {
            self.driver.scroll_to_bottom().await?;
            scrolls += 1;

            if let Some(load_more) = &self.selectors.load_more {
                if self.driver.click_first_enabled(load_more).await? {
                    tracing::debug!("Clicked load-more control");
                }
            }

            if !self.scroll.pause.is_zero() {
                tokio::time::sleep(self.scroll.pause).await;
            }

            let height = self.driver.scroll_height().await?;
            if height == last_height {
                unchanged += 1;
                if unchanged >= self.scroll.stable_checks {
                    break;
                }
            } else {
                unchanged = 0;
                last_height = height;
            }
        }

        if scrolls >= self.scroll.max_scrolls && unchanged < self.scroll.stable_checks {
            tracing::warn!(
                "Stopped scrolling after {} iterations; the list may be incomplete",
                scrolls
            );
        }
        Ok(scrolls)
    }

    async fn open_profile(&mut self) -> Result<(), SourceError> {
        match tokio::time::timeout(self.page_load_timeout, self.driver.goto(&self.profile_url)).await
        {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout(format!(
                "profile page {} did not load within {:?}",
                self.profile_url, self.page_load_timeout
            ))),
        }
    }

    async fn load_list(&mut self) -> Result<Vec<String>, SourceError> {
        self.open_profile().await?;
        let scrolls = self.scroll_until_stable().await?;
        tracing::debug!("Scrolled {} times", scrolls);

        let container = self.selectors.list_container.clone();
        if !self.driver.wait_for(&container, self.list_timeout).await? {
            tracing::warn!(
                "Publication list {} did not appear within {:?}",
                container,
                self.list_timeout
            );
        }

        let rows = self.driver.outer_html_all(&self.row).await?;
        self.row_count = rows.len();
        self.needs_reload = false;
        Ok(rows)
    }

    async fn read_overlay(&mut self, index: usize) -> Result<String, SourceError> {
        let link = format!("{} {}", self.row, self.selectors.row_link);
        self.driver.click_nth(&link, index).await?;

        let title = self.selectors.overlay_title.clone();
        if !self.driver.wait_for(&title, self.overlay_timeout).await? {
            return Err(SourceError::Timeout(format!(
                "detail overlay for row {} did not open",
                index
            )));
        }

        let text = self
            .driver
            .text_of(&self.abstract_selector)
            .await?
            .unwrap_or_default();
        Ok(text.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    /// Close the overlay; the session is marked for reload if it stays open
    async fn close_overlay(&mut self) {
        let close = self.selectors.overlay_close.clone();
        let title = self.selectors.overlay_title.clone();

        let closed = match self.driver.click_first_enabled(&close).await {
            Ok(_) => matches!(
                self.driver.wait_gone(&title, self.overlay_timeout).await,
                Ok(true)
            ),
            Err(e) => {
                tracing::debug!("Overlay close failed: {}", e);
                false
            }
        };

        if !closed {
            tracing::warn!("Detail overlay did not close; reloading the profile page");
            self.needs_reload = true;
        }
    }
}

#[async_trait]
impl Source for BrowserSource {
    fn id(&self) -> &str {
        "browser"
    }

    fn name(&self) -> &str {
        "Headless browser"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::LIST | SourceCapabilities::ABSTRACTS | SourceCapabilities::CITATION_COUNTS
    }

    async fn list_publications(&mut self) -> Result<AcquisitionResult, SourceError> {
        let rows = self.load_list().await?;

        if rows.is_empty() {
            tracing::warn!(
                "No publication rows rendered at {}; the profile may be empty or the request was challenged",
                self.profile_url
            );
        }
        Ok(AcquisitionResult::Markup(rows))
    }

    async fn fetch_abstract(&mut self, index: usize) -> Result<String, SourceError> {
        if index >= self.row_count {
            return Err(SourceError::IndexOutOfRange(index));
        }

        if self.needs_reload {
            self.load_list().await?;
            if index >= self.row_count {
                return Err(SourceError::IndexOutOfRange(index));
            }
        }

        let result = self.read_overlay(index).await;
        self.close_overlay().await;
        result
    }

    async fn shutdown(&mut self) -> Result<(), SourceError> {
        self.driver.quit().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    /// In-memory page: a height sequence for scrolling, rows, and overlays
    #[derive(Debug, Default)]
    struct ScriptedPage {
        heights: Vec<u64>,
        height_reads: usize,
        scrolls: u32,
        rows: Vec<String>,
        abstracts: Vec<Option<String>>,
        list_appears: bool,
        stuck_overlays: HashSet<usize>,
        overlay_open: Option<usize>,
        events: Vec<String>,
        gotos: u32,
        hangs_on_load: bool,
        quit: bool,
    }

    #[derive(Debug, Clone)]
    struct ScriptedDriver(Arc<Mutex<ScriptedPage>>);

    impl ScriptedDriver {
        fn page(&self) -> std::sync::MutexGuard<'_, ScriptedPage> {
            self.0.lock().unwrap()
        }
    }

    #[async_trait]
    impl BrowserDriver for ScriptedDriver {
        async fn goto(&mut self, _url: &str) -> Result<(), SourceError> {
            let hangs = {
                let mut page = self.page();
                page.gotos += 1;
                page.overlay_open = None;
                page.height_reads = 0;
                page.hangs_on_load
            };
            if hangs {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(())
        }

        async fn scroll_height(&mut self) -> Result<u64, SourceError> {
            let mut page = self.page();
            let index = page.height_reads.min(page.heights.len().saturating_sub(1));
            page.height_reads += 1;
            Ok(page.heights.get(index).copied().unwrap_or(0))
        }

        async fn scroll_to_bottom(&mut self) -> Result<(), SourceError> {
            self.page().scrolls += 1;
            Ok(())
        }

        async fn click_first_enabled(&mut self, selector: &str) -> Result<bool, SourceError> {
            let mut page = self.page();
            if selector.contains("cita-d-x") {
                if let Some(index) = page.overlay_open {
                    page.events.push(format!("close {}", index));
                    if !page.stuck_overlays.contains(&index) {
                        page.overlay_open = None;
                    }
                    return Ok(true);
                }
            }
            Ok(false)
        }

        async fn wait_for(&mut self, selector: &str, _timeout: Duration) -> Result<bool, SourceError> {
            let page = self.page();
            if selector.contains("oci_title") {
                return Ok(page.overlay_open.is_some());
            }
            Ok(page.list_appears)
        }

        async fn wait_gone(&mut self, _selector: &str, _timeout: Duration) -> Result<bool, SourceError> {
            Ok(self.page().overlay_open.is_none())
        }

        async fn outer_html_all(&mut self, _selector: &str) -> Result<Vec<String>, SourceError> {
            Ok(self.page().rows.clone())
        }

        async fn click_nth(&mut self, _selector: &str, index: usize) -> Result<(), SourceError> {
            let mut page = self.page();
            if page.overlay_open.is_some() {
                return Err(SourceError::Browser("overlay already open".into()));
            }
            page.events.push(format!("open {}", index));
            if page.abstracts.get(index).is_some_and(Option::is_some) {
                page.overlay_open = Some(index);
            }
            Ok(())
        }

        async fn text_of(&mut self, _selector: &str) -> Result<Option<String>, SourceError> {
            let page = self.page();
            Ok(page
                .overlay_open
                .and_then(|index| page.abstracts.get(index).cloned().flatten()))
        }

        async fn quit(&mut self) -> Result<(), SourceError> {
            self.page().quit = true;
            Ok(())
        }
    }

    fn scripted(page: ScriptedPage) -> (BrowserSource, ScriptedDriver) {
        let driver = ScriptedDriver(Arc::new(Mutex::new(page)));
        let mut config = Config::default();
        config.profile.author_id = "abc".to_string();
        config.browser.scroll_pause_ms = 0;
        config.browser.max_scrolls = 5;
        config.browser.stable_checks = 2;
        config.browser.page_load_timeout_secs = 1;

        let source = BrowserSource::new(Box::new(driver.clone()), &config).unwrap();
        (source, driver)
    }

    fn rows(count: usize) -> Vec<String> {
        (0..count)
            .map(|i| format!(r#"<tr class="gsc_a_tr"><td class="gsc_a_t"><a class="gsc_a_at">Paper {}</a></td></tr>"#, i))
            .collect()
    }

    #[tokio::test]
    async fn test_scrolling_stops_when_height_is_stable() {
        let (mut source, driver) = scripted(ScriptedPage {
            heights: vec![1000, 2000, 3000, 3000, 3000],
            rows: rows(3),
            list_appears: true,
            ..ScriptedPage::default()
        });

        let result = source.list_publications().await.unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(driver.page().scrolls, 4);
    }

    #[tokio::test]
    async fn test_scrolling_is_bounded() {
        let (mut source, driver) = scripted(ScriptedPage {
            heights: (1..=20).map(|i| i * 1000).collect(),
            rows: rows(2),
            list_appears: true,
            ..ScriptedPage::default()
        });

        source.list_publications().await.unwrap();
        assert_eq!(driver.page().scrolls, 5);
    }

    #[tokio::test]
    async fn test_missing_list_container_is_not_fatal() {
        let (mut source, _driver) = scripted(ScriptedPage {
            heights: vec![500],
            rows: rows(1),
            list_appears: false,
            ..ScriptedPage::default()
        });

        assert_eq!(source.list_publications().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_overlays_open_and_close_in_turn() {
        let (mut source, driver) = scripted(ScriptedPage {
            heights: vec![500],
            rows: rows(3),
            abstracts: vec![Some("First  abstract".into()), None, Some("Third".into())],
            list_appears: true,
            ..ScriptedPage::default()
        });

        source.list_publications().await.unwrap();

        assert_eq!(source.fetch_abstract(0).await.unwrap(), "First abstract");
        assert!(matches!(
            source.fetch_abstract(1).await,
            Err(SourceError::Timeout(_))
        ));
        assert_eq!(source.fetch_abstract(2).await.unwrap(), "Third");
        assert!(matches!(
            source.fetch_abstract(3).await,
            Err(SourceError::IndexOutOfRange(3))
        ));

        let events = driver.page().events.clone();
        assert_eq!(events, vec!["open 0", "close 0", "open 1", "open 2", "close 2"]);
    }

    #[tokio::test]
    async fn test_stuck_overlay_triggers_reload() {
        let (mut source, driver) = scripted(ScriptedPage {
            heights: vec![500],
            rows: rows(2),
            abstracts: vec![Some("A".into()), Some("B".into())],
            list_appears: true,
            stuck_overlays: HashSet::from([0]),
            ..ScriptedPage::default()
        });

        source.list_publications().await.unwrap();
        assert_eq!(source.fetch_abstract(0).await.unwrap(), "A");
        assert_eq!(source.fetch_abstract(1).await.unwrap(), "B");

        assert_eq!(driver.page().gotos, 2);
    }

    #[tokio::test]
    async fn test_hung_page_load_times_out() {
        let (mut source, driver) = scripted(ScriptedPage {
            hangs_on_load: true,
            ..ScriptedPage::default()
        });

        let result = tokio::time::timeout(Duration::from_secs(5), source.list_publications())
            .await
            .expect("page load must be bounded");

        assert!(matches!(result, Err(SourceError::Timeout(_))));
        assert_eq!(driver.page().scrolls, 0);
    }

    #[tokio::test]
    async fn test_shutdown_quits_session() {
        let (mut source, driver) = scripted(ScriptedPage::default());
        source.shutdown().await.unwrap();
        assert!(driver.page().quit);
    }
}
