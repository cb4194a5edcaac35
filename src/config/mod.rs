//! Configuration management.
//!
//! Every section has defaults, so an empty configuration is valid apart from
//! the author identifier, which must come from a file, the environment or
//! the command line.

mod file_config;

pub use file_config::{find_config_file, load_config, ConfigError, ConfigFile};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::parser::{FieldKeys, MarkupSelectors};
use crate::sources::SourceKind;
use crate::utils::{AuthorSplit, DuplicateStrategy, UnknownYear};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub profile: ProfileConfig,

    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub browser: BrowserConfig,

    /// Fallback-key priority lists per logical field
    #[serde(default)]
    pub fields: FieldKeys,

    /// CSS selectors for one publication row
    #[serde(default)]
    pub markup: MarkupSelectors,

    #[serde(default)]
    pub normalize: NormalizeConfig,

    #[serde(default)]
    pub dedup: DedupConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Check the values that have no usable default
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.profile.author_id.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "profile.author_id is required".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.dedup.title_similarity) {
            return Err(ConfigError::Invalid(format!(
                "dedup.title_similarity must be within 0..=1, got {}",
                self.dedup.title_similarity
            )));
        }
        self.markup
            .check()
            .map_err(|e| ConfigError::Invalid(format!("markup: {}", e)))?;
        Ok(())
    }
}

/// The profile being harvested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Author/profile identifier
    #[serde(default)]
    pub author_id: String,

    /// Base URL the profile URL is templated from
    #[serde(default = "default_profile_base_url")]
    pub base_url: String,

    /// Interface language (`hl` query parameter)
    #[serde(default = "default_language")]
    pub language: Option<String>,

    /// View mode (`view_op` query parameter)
    #[serde(default = "default_view")]
    pub view: Option<String>,

    /// Server-side sort order (`sortby` query parameter)
    #[serde(default)]
    pub sort_by: Option<String>,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            author_id: String::new(),
            base_url: default_profile_base_url(),
            language: default_language(),
            view: default_view(),
            sort_by: None,
        }
    }
}

impl ProfileConfig {
    /// Profile page URL with the configured query parameters
    pub fn profile_url(&self) -> Result<url::Url, ConfigError> {
        let base = self.base_url.trim_end_matches('/');
        let mut url = url::Url::parse(&format!("{}/citations", base))
            .map_err(|e| ConfigError::Invalid(format!("profile.base_url: {}", e)))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("user", self.author_id.trim());
            if let Some(language) = &self.language {
                query.append_pair("hl", language);
            }
            if let Some(view) = &self.view {
                query.append_pair("view_op", view);
            }
            if let Some(sort_by) = &self.sort_by {
                query.append_pair("sortby", sort_by);
            }
        }

        Ok(url)
    }
}

fn default_profile_base_url() -> String {
    "https://scholar.google.com".to_string()
}

fn default_language() -> Option<String> {
    Some("en".to_string())
}

fn default_view() -> Option<String> {
    Some("list_works".to_string())
}

/// Which strategy to use and what to collect
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    #[serde(default)]
    pub mode: SourceKind,

    /// Run the abstract enrichment step
    #[serde(default)]
    pub fetch_abstracts: bool,

    /// Add citation counts to records
    #[serde(default)]
    pub include_citations: bool,
}

/// Structured author API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_base_url")]
    pub base_url: String,

    /// API key; falls back to SERPAPI_API_KEY
    #[serde(default)]
    pub api_key: Option<String>,

    /// Articles requested per author page
    #[serde(default = "default_api_page_size")]
    pub page_size: usize,

    /// Upper bound on author pages
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Fetch a detail object per publication while listing
    #[serde(default = "default_true")]
    pub fetch_details: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            api_key: None,
            page_size: default_api_page_size(),
            max_pages: default_max_pages(),
            fetch_details: true,
        }
    }
}

impl ApiConfig {
    /// Configured key, or the SERPAPI_API_KEY environment variable
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("SERPAPI_API_KEY").ok())
    }
}

fn default_api_base_url() -> String {
    "https://serpapi.com".to_string()
}

fn default_api_page_size() -> usize {
    100
}

fn default_max_pages() -> usize {
    20
}

fn default_true() -> bool {
    true
}

/// Outbound HTTP settings shared by the api and html strategies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,

    /// Proxy URL applied to all requests
    #[serde(default)]
    pub proxy: Option<String>,

    /// Minimum spacing between requests, 0 disables pacing
    #[serde(default)]
    pub min_interval_ms: u64,

    /// Rows requested per profile page (html strategy)
    #[serde(default = "default_html_page_size")]
    pub page_size: usize,

    /// Upper bound on profile pages (html strategy)
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_http_timeout(),
            proxy: None,
            min_interval_ms: 0,
            page_size: default_html_page_size(),
            max_pages: default_max_pages(),
        }
    }
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}

fn default_http_timeout() -> u64 {
    30
}

fn default_html_page_size() -> usize {
    100
}

/// Retry settings for remote requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts
    #[serde(default = "default_retry_delay")]
    pub delay_ms: u64,

    #[serde(default = "default_http_timeout")]
    pub attempt_timeout_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_retry_delay(),
            attempt_timeout_secs: default_http_timeout(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    2000
}

/// WebDriver browser to request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chrome,
    Firefox,
}

/// Headless browser settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// WebDriver endpoint (chromedriver, geckodriver, selenium)
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    #[serde(default)]
    pub browser: BrowserKind,

    #[serde(default = "default_true")]
    pub headless: bool,

    /// Maximum lazy-load scroll iterations
    #[serde(default = "default_max_scrolls")]
    pub max_scrolls: u32,

    /// Consecutive unchanged height checks that end scrolling
    #[serde(default = "default_stable_checks")]
    pub stable_checks: u32,

    /// Pause after each scroll
    #[serde(default = "default_scroll_pause")]
    pub scroll_pause_ms: u64,

    /// Navigation to the profile page, including reloads
    #[serde(default = "default_page_load_timeout")]
    pub page_load_timeout_secs: u64,

    /// Wait for the publication list container
    #[serde(default = "default_wait_timeout")]
    pub list_timeout_secs: u64,

    /// Wait for an overlay to open or close
    #[serde(default = "default_wait_timeout")]
    pub overlay_timeout_secs: u64,

    #[serde(default)]
    pub selectors: BrowserSelectors,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            browser: BrowserKind::default(),
            headless: true,
            max_scrolls: default_max_scrolls(),
            stable_checks: default_stable_checks(),
            scroll_pause_ms: default_scroll_pause(),
            page_load_timeout_secs: default_page_load_timeout(),
            list_timeout_secs: default_wait_timeout(),
            overlay_timeout_secs: default_wait_timeout(),
            selectors: BrowserSelectors::default(),
        }
    }
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_max_scrolls() -> u32 {
    30
}

fn default_stable_checks() -> u32 {
    2
}

fn default_scroll_pause() -> u64 {
    1500
}

fn default_wait_timeout() -> u64 {
    10
}

fn default_page_load_timeout() -> u64 {
    30
}

/// Page-level selectors used while driving the browser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserSelectors {
    /// Publication list container
    #[serde(default = "default_list_container")]
    pub list_container: String,

    /// Element inside a row that opens its detail overlay
    #[serde(default = "default_row_link")]
    pub row_link: String,

    /// "Show more" button, clicked on each scroll iteration if enabled
    #[serde(default = "default_load_more")]
    pub load_more: Option<String>,

    /// Overlay title; its appearance means the overlay is open
    #[serde(default = "default_overlay_title")]
    pub overlay_title: String,

    /// Overlay close control
    #[serde(default = "default_overlay_close")]
    pub overlay_close: String,
}

impl Default for BrowserSelectors {
    fn default() -> Self {
        Self {
            list_container: default_list_container(),
            row_link: default_row_link(),
            load_more: default_load_more(),
            overlay_title: default_overlay_title(),
            overlay_close: default_overlay_close(),
        }
    }
}

fn default_list_container() -> String {
    "#gsc_a_b".to_string()
}

fn default_row_link() -> String {
    "a.gsc_a_at".to_string()
}

fn default_load_more() -> Option<String> {
    Some("#gsc_bpf_more".to_string())
}

fn default_overlay_title() -> String {
    "#gsc_oci_title".to_string()
}

fn default_overlay_close() -> String {
    "#gs_md_cita-d-x, #gs_hdr_bck".to_string()
}

/// Normalization rules
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeConfig {
    #[serde(default)]
    pub author_split: AuthorSplit,

    #[serde(default)]
    pub unknown_year: UnknownYear,
}

/// Duplicate removal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub strategy: DuplicateStrategy,

    /// Jaro-Winkler threshold on normalized titles
    #[serde(default = "default_title_similarity")]
    pub title_similarity: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strategy: DuplicateStrategy::default(),
            title_similarity: default_title_similarity(),
        }
    }
}

fn default_title_similarity() -> f64 {
    0.97
}

/// What to write when the run fails fatally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FatalPolicy {
    /// Write nothing
    #[default]
    Skip,
    /// Write `{"items": []}`
    Empty,
}

/// Output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,

    #[serde(default)]
    pub on_fatal: FatalPolicy,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            on_fatal: FatalPolicy::default(),
        }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from("publications.json")
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "text" or "json"
    #[serde(default)]
    pub format: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
