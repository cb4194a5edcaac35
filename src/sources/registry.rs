//! Strategy selection: builds the configured acquisition strategy.

use serde::{Deserialize, Serialize};

use super::{
    api::AuthorApiSource, browser::BrowserSource, profile_page::ProfilePageSource,
    webdriver::WebDriverSession, Source, SourceError,
};
use crate::config::Config;

bitflags::bitflags! {
    /// Capabilities that a strategy can support
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SourceCapabilities: u32 {
        const LIST = 1 << 0;
        const ABSTRACTS = 1 << 1;
        const CITATION_COUNTS = 1 << 2;
    }
}

/// Available acquisition strategies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Structured author API
    #[default]
    Api,
    /// Headless browser rendering
    Browser,
    /// Static profile pages over HTTP
    Html,
}

impl SourceKind {
    pub fn id(&self) -> &'static str {
        match self {
            SourceKind::Api => "api",
            SourceKind::Browser => "browser",
            SourceKind::Html => "html",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Build the strategy selected by `acquisition.mode`
///
/// For the browser strategy this starts the WebDriver session; failing to do
/// so is fatal for the run.
pub async fn connect_source(config: &Config) -> Result<Box<dyn Source>, SourceError> {
    let source: Box<dyn Source> = match config.acquisition.mode {
        SourceKind::Api => Box::new(AuthorApiSource::new(config)?),
        SourceKind::Html => Box::new(ProfilePageSource::new(config)?),
        SourceKind::Browser => {
            let session = WebDriverSession::connect(&config.browser).await?;
            Box::new(BrowserSource::new(Box::new(session), config)?)
        }
    };

    tracing::info!("Using {} acquisition strategy", source.name());
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(mode: SourceKind) -> Config {
        let mut config = Config::default();
        config.profile.author_id = "abc".to_string();
        config.acquisition.mode = mode;
        config
    }

    #[tokio::test]
    async fn test_connect_html_source() {
        let source = connect_source(&config(SourceKind::Html)).await.unwrap();
        assert_eq!(source.id(), "html");
        assert!(source.supports_abstracts());
    }

    #[tokio::test]
    async fn test_connect_api_source_with_key() {
        let mut config = config(SourceKind::Api);
        config.api.api_key = Some("key".to_string());

        let source = connect_source(&config).await.unwrap();
        assert_eq!(source.id(), "api");
        assert!(source
            .capabilities()
            .contains(SourceCapabilities::CITATION_COUNTS));
    }

    #[tokio::test]
    async fn test_browser_launch_failure_is_fatal() {
        let mut config = config(SourceKind::Browser);
        config.browser.webdriver_url = "http://127.0.0.1:9".to_string();

        let result = connect_source(&config).await;
        assert!(matches!(result, Err(SourceError::Browser(_))));
    }

    #[test]
    fn test_source_kind_display() {
        assert_eq!(SourceKind::Browser.to_string(), "browser");
        assert_eq!(SourceKind::default(), SourceKind::Api);
    }
}
