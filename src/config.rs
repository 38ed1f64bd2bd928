use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::deck::DeckSettings;
use crate::providers::{ProviderError, ProviderResult};

/// Runtime settings for the swipe app.
///
/// Sources, lowest priority first: built-in defaults, `edh-swipe.toml` in the
/// working directory (optional), `EDH_SWIPE_*` environment variables.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SwipeConfig {
    pub api_endpoint: String,
    pub base_query: String,
    pub batch_size: usize,
    pub low_water_mark: usize,
    pub request_delay_ms: u64,
    pub max_fetch_attempts: u32,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub page_size: usize,
    pub data_dir: PathBuf,
    pub storage_key: String,
}

impl SwipeConfig {
    pub const FILE_NAME: &'static str = "edh-swipe";
    pub const ENV_PREFIX: &'static str = "EDH_SWIPE";

    /// Load from the default file location and the environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder_with_defaults()?
            .add_source(File::with_name(Self::FILE_NAME).required(false))
            .add_source(Environment::with_prefix(Self::ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Load from an explicit file, without consulting the environment
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Self::builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize()
    }

    fn builder_with_defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("api_endpoint", "https://api.scryfall.com/cards/random")?
            .set_default("base_query", "is:commander")?
            .set_default("batch_size", 10_i64)?
            .set_default("low_water_mark", 5_i64)?
            .set_default("request_delay_ms", 75_i64)?
            .set_default("max_fetch_attempts", 10_i64)?
            .set_default("request_timeout_secs", 30_i64)?
            .set_default("user_agent", concat!("edh-swipe/", env!("CARGO_PKG_VERSION")))?
            .set_default("page_size", 8_i64)?
            .set_default("data_dir", ".edh-swipe")?
            .set_default("storage_key", "Cards")
    }

    /// Reject settings the deck or the HTTP client cannot work with
    pub fn validate(&self) -> ProviderResult<()> {
        let endpoint = url::Url::parse(&self.api_endpoint).map_err(|e| {
            ProviderError::ConfigurationError(format!("api_endpoint '{}': {}", self.api_endpoint, e))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ProviderError::ConfigurationError(format!(
                "api_endpoint must be http(s), got '{}'",
                endpoint.scheme()
            )));
        }
        if self.batch_size == 0 {
            return Err(ProviderError::ConfigurationError("batch_size must be at least 1".to_string()));
        }
        if self.low_water_mark > self.batch_size {
            return Err(ProviderError::ConfigurationError(format!(
                "low_water_mark ({}) cannot exceed batch_size ({})",
                self.low_water_mark, self.batch_size
            )));
        }
        if self.max_fetch_attempts == 0 {
            return Err(ProviderError::ConfigurationError(
                "max_fetch_attempts must be at least 1".to_string(),
            ));
        }
        if self.page_size == 0 {
            return Err(ProviderError::ConfigurationError("page_size must be at least 1".to_string()));
        }
        if self.storage_key.trim().is_empty() {
            return Err(ProviderError::ConfigurationError("storage_key cannot be empty".to_string()));
        }
        Ok(())
    }

    pub fn deck_settings(&self) -> DeckSettings {
        DeckSettings {
            batch_size: self.batch_size,
            low_water_mark: self.low_water_mark,
            request_delay: Duration::from_millis(self.request_delay_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for SwipeConfig {
    fn default() -> Self {
        Self {
            api_endpoint: "https://api.scryfall.com/cards/random".to_string(),
            base_query: "is:commander".to_string(),
            batch_size: 10,
            low_water_mark: 5,
            request_delay_ms: 75,
            max_fetch_attempts: 10,
            request_timeout_secs: 30,
            user_agent: concat!("edh-swipe/", env!("CARGO_PKG_VERSION")).to_string(),
            client_secret: None,
            page_size: 8,
            data_dir: PathBuf::from(".edh-swipe"),
            storage_key: "Cards".to_string(),
        }
    }
}
