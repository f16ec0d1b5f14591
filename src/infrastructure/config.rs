//! Configuration infrastructure
//!
//! Configuration is loaded once at process start and passed around as an
//! explicit, read-only value. Layers, lowest precedence first:
//! 1. Built-in defaults (serde defaults below)
//! 2. `config/default.{toml,yaml,json}` in the working directory
//! 3. `<user config dir>/catalog-ingest/config.*`
//! 4. An explicit file given on the command line
//! 5. Environment variables, e.g. `CATALOG_INGEST__STORAGE__CATALOG_PATH`

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::infrastructure::parsing::ProductListSelectors;

pub const ENV_PREFIX: &str = "CATALOG_INGEST";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration value for '{field}': {message}")]
    Validation { field: String, message: String },
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root of the paginated listing site; pages live under `{base_url}/page/{n}`
    pub base_url: String,

    /// Bearer token required by the HTTP trigger
    pub token: String,

    pub scraping: ScrapingConfig,
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Scraper behaviour shared by every run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// User agent sent with every page and image request
    pub user_agent: String,

    /// Per-request deadline in seconds
    pub request_timeout_seconds: u64,

    /// Directory downloaded product images are written to
    pub image_dir: PathBuf,

    /// CSS selectors for the listing markup
    pub selectors: ProductListSelectors,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding the accumulated catalog
    pub catalog_path: PathBuf,

    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Sqlite,
    Redis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,

    /// Connection URL: `sqlite://...` for SQLite, `redis://...` for Redis
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Directory for rolling log files
    pub log_dir: PathBuf,

    /// Module-specific log level filters (e.g., "sqlx": "warn", "reqwest": "info")
    pub module_filters: HashMap<String, String>,
}

pub mod defaults {
    pub const BASE_URL: &str = "https://www.example-shop.com/shop";

    pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3";

    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

    pub const IMAGE_DIR: &str = "images";

    pub const CATALOG_PATH: &str = "scrapped_data.json";

    pub const SQLITE_CACHE_URL: &str = "sqlite://price_cache.db";

    pub const BIND_ADDR: &str = "127.0.0.1:8000";

    pub const LOG_LEVEL: &str = "info";

    pub const LOG_DIR: &str = "logs";

    /// Pages scraped when the caller gives no limit
    pub const PAGE_LIMIT: u32 = 5;

    pub const MAX_RETRIES: u32 = 3;

    pub const RETRY_DELAY_SECONDS: u64 = 5;
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::BASE_URL.to_string(),
            token: String::new(),
            scraping: ScrapingConfig::default(),
            storage: StorageConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::USER_AGENT.to_string(),
            request_timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            image_dir: PathBuf::from(defaults::IMAGE_DIR),
            selectors: ProductListSelectors::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from(defaults::CATALOG_PATH),
            cache: CacheConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Sqlite,
            url: defaults::SQLITE_CACHE_URL.to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: defaults::BIND_ADDR.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let mut module_filters = HashMap::new();
        module_filters.insert("sqlx".to_string(), "warn".to_string());
        module_filters.insert("reqwest".to_string(), "info".to_string());

        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: false,
            console_output: true,
            file_output: false,
            log_dir: PathBuf::from(defaults::LOG_DIR),
            module_filters,
        }
    }
}

impl AppConfig {
    /// Get the per-user configuration directory
    pub fn user_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("catalog-ingest"))
    }

    /// Load configuration from all layers, with an optional explicit file on top
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        if let Some(dir) = Self::user_config_dir() {
            let user_file = dir.join("config");
            builder = builder.add_source(
                config::File::with_name(&user_file.to_string_lossy()).required(false),
            );
        }

        if let Some(path) = explicit {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;

        info!("✅ Configuration loaded (base_url={})", config.base_url);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match Url::parse(&self.base_url) {
            Ok(url) if url.has_host() => {}
            Ok(_) => return Err(validation("base_url", "URL has no host")),
            Err(e) => return Err(validation("base_url", &e.to_string())),
        }

        if self.scraping.user_agent.trim().is_empty() {
            return Err(validation("scraping.user_agent", "must not be empty"));
        }

        if self.scraping.request_timeout_seconds == 0 {
            return Err(validation(
                "scraping.request_timeout_seconds",
                "must be greater than 0",
            ));
        }

        if self.storage.catalog_path.as_os_str().is_empty() {
            return Err(validation("storage.catalog_path", "must not be empty"));
        }

        Ok(())
    }
}

fn validation(field: &str, message: &str) -> ConfigError {
    ConfigError::Validation {
        field: field.to_string(),
        message: message.to_string(),
    }
}
