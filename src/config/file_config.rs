//! Configuration file support.
//!
//! Settings are read from an optional TOML file and overridden by environment
//! variables prefixed with `SCHOLAR_PUBS_` (double underscore separates
//! nesting levels).
//!
//! # Configuration File Format
//!
//! ```toml
//! [profile]
//! author_id = "GOCSqdUAAAAJ"
//! language = "en"
//!
//! [acquisition]
//! mode = "browser"            # "api", "browser" or "html"
//! fetch_abstracts = true
//! include_citations = false
//!
//! [api]
//! api_key = "your-serpapi-key"
//!
//! [retry]
//! max_attempts = 3
//! delay_ms = 2000
//!
//! [browser]
//! webdriver_url = "http://localhost:4444"
//! max_scrolls = 30
//! stable_checks = 2
//!
//! [fields]
//! venue = ["venue", "journal", "conference", "booktitle", "publisher"]
//!
//! [normalize]
//! author_split = "and_and_comma"   # or "and_only"
//! unknown_year = "last"            # or "first"
//!
//! [output]
//! path = "publications.json"
//! on_fatal = "skip"                # or "empty"
//! ```

use std::path::{Path, PathBuf};

use super::Config;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "SCHOLAR_PUBS";

/// File name looked up in the working directory
const LOCAL_CONFIG_NAME: &str = "scholar-pubs.toml";

/// Find a configuration file in the default locations
///
/// Checks `./scholar-pubs.toml`, then `<config dir>/scholar-pubs/config.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("scholar-pubs").join("config.toml"))
        .filter(|path| path.is_file())
}

/// Load configuration from an optional file plus environment overrides
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// TOML view of a [`Config`], used to write starter files
#[derive(Debug)]
pub struct ConfigFile {
    config: Config,
}

impl ConfigFile {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Load a configuration from a TOML file, without environment overrides
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save the configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(&self.config)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
