//! Trigger commands shared by the HTTP server and the CLI
//!
//! `AppContext` is built once at startup from the loaded configuration. Each
//! scrape builds its own page scraper, since proxy and retry settings are
//! chosen per invocation.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::application::{IngestionError, IngestionService, LogNotifier, Notifier};
use crate::domain::ProductRecord;
use crate::infrastructure::catalog_store::{CatalogStore, JsonCatalogStore};
use crate::infrastructure::config::{AppConfig, defaults};
use crate::infrastructure::http_client::{self, HttpError};
use crate::infrastructure::price_cache::{self, CacheError, PriceCache};
use crate::infrastructure::scraper::{PageScraper, ProductPageScraper, ScrapeSettings};

pub const SUCCESS_MESSAGE: &str = "Scraping completed successfully!";

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid parameter '{field}': {message}")]
    InvalidParameter { field: &'static str, message: String },

    #[error("Failed to prepare scraper: {0:#}")]
    Setup(anyhow::Error),

    #[error("Failed to open price cache: {0}")]
    Cache(#[from] CacheError),

    #[error("Ingestion failed: {0}")]
    Ingestion(#[from] IngestionError),
}

impl CommandError {
    /// True when the caller sent bad parameters rather than the run failing
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidParameter { .. })
    }
}

fn default_limit() -> u32 {
    defaults::PAGE_LIMIT
}

fn default_max_retries() -> u32 {
    defaults::MAX_RETRIES
}

fn default_retry_delay() -> u64 {
    defaults::RETRY_DELAY_SECONDS
}

/// Parameters of one scrape invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
pub struct ScrapeCommand {
    /// Number of listing pages to walk, starting at page 1
    #[arg(long, default_value_t = defaults::PAGE_LIMIT)]
    #[serde(default = "default_limit")]
    pub limit: u32,

    /// Proxy URL for every request; empty means a direct connection
    #[arg(long, default_value = "")]
    #[serde(default)]
    pub proxy: String,

    /// Attempts per page before it is skipped
    #[arg(long, default_value_t = defaults::MAX_RETRIES)]
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Seconds to wait between attempts
    #[arg(long, default_value_t = defaults::RETRY_DELAY_SECONDS)]
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,

    /// Respond with the whole catalog
    #[arg(long = "return-all")]
    #[serde(default)]
    pub return_all_scraped_data: bool,

    /// Respond with the records scraped by this run
    #[arg(long = "return-current")]
    #[serde(default)]
    pub return_current_scraped_data: bool,
}

impl Default for ScrapeCommand {
    fn default() -> Self {
        Self {
            limit: defaults::PAGE_LIMIT,
            proxy: String::new(),
            max_retries: defaults::MAX_RETRIES,
            retry_delay: defaults::RETRY_DELAY_SECONDS,
            return_all_scraped_data: false,
            return_current_scraped_data: false,
        }
    }
}

impl ScrapeCommand {
    pub fn validate(&self) -> Result<(), CommandError> {
        if self.max_retries < 1 {
            return Err(CommandError::InvalidParameter {
                field: "max_retries",
                message: "must be at least 1".to_string(),
            });
        }
        if self.retry_delay < 1 {
            return Err(CommandError::InvalidParameter {
                field: "retry_delay",
                message: "must be at least 1 second".to_string(),
            });
        }
        let proxy = self.proxy.trim();
        if !proxy.is_empty() {
            http_client::validate_proxy(proxy).map_err(|e| CommandError::InvalidParameter {
                field: "proxy",
                message: e.to_string(),
            })?;
        }
        Ok(())
    }

    pub fn settings(&self, base_url: &str) -> ScrapeSettings {
        let proxy = self.proxy.trim();
        ScrapeSettings {
            base_url: base_url.to_string(),
            proxy: (!proxy.is_empty()).then(|| proxy.to_string()),
            max_retries: self.max_retries,
            retry_delay: Duration::from_secs(self.retry_delay),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScrapeResponse {
    Records(Vec<ProductRecord>),
    Message { message: String },
}

impl ScrapeResponse {
    pub fn completed() -> Self {
        Self::Message {
            message: SUCCESS_MESSAGE.to_string(),
        }
    }
}

/// Long-lived collaborators shared by every command
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub catalog: Arc<dyn CatalogStore>,
    pub cache: Arc<dyn PriceCache>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        catalog: Arc<dyn CatalogStore>,
        cache: Arc<dyn PriceCache>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            catalog,
            cache,
            notifier,
        }
    }

    /// Open the configured catalog file and price cache
    pub async fn initialize(config: AppConfig) -> Result<Self, CommandError> {
        let catalog = Arc::new(JsonCatalogStore::new(&config.storage.catalog_path));
        let cache = price_cache::connect(&config.storage.cache).await?;
        Ok(Self::new(config, catalog, cache, Arc::new(LogNotifier)))
    }

    fn ingestion(&self, scraper: Arc<dyn PageScraper>) -> IngestionService {
        IngestionService::new(
            scraper,
            self.catalog.clone(),
            self.cache.clone(),
            self.notifier.clone(),
        )
    }
}

fn setup_error(e: anyhow::Error) -> CommandError {
    match e.downcast::<HttpError>() {
        Ok(e @ HttpError::InvalidProxy { .. }) => CommandError::InvalidParameter {
            field: "proxy",
            message: e.to_string(),
        },
        Ok(other) => CommandError::Setup(other.into()),
        Err(e) => CommandError::Setup(e),
    }
}

pub async fn execute_scrape(
    ctx: &AppContext,
    command: &ScrapeCommand,
) -> Result<ScrapeResponse, CommandError> {
    command.validate()?;
    info!(
        "Scrape requested: limit={}, max_retries={}, retry_delay={}s, proxy={}",
        command.limit,
        command.max_retries,
        command.retry_delay,
        if command.proxy.trim().is_empty() { "none" } else { "set" }
    );

    let settings = command.settings(&ctx.config.base_url);
    let scraper =
        ProductPageScraper::from_settings(&ctx.config.scraping, &settings).map_err(setup_error)?;
    let service = ctx.ingestion(Arc::new(scraper));

    let report = service
        .run(command.limit, command.return_current_scraped_data)
        .await?;

    if let Some(current) = report.scraped {
        return Ok(ScrapeResponse::Records(current));
    }
    if command.return_all_scraped_data {
        return Ok(ScrapeResponse::Records(service.all_products().await?));
    }
    Ok(ScrapeResponse::completed())
}

pub async fn list_products(ctx: &AppContext) -> Result<Vec<ProductRecord>, CommandError> {
    let products = ctx
        .catalog
        .load_all()
        .await
        .map_err(IngestionError::from)?;
    Ok(products)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::catalog_store::InMemoryCatalogStore;
    use crate::infrastructure::price_cache::InMemoryPriceCache;

    fn context(base_url: &str, image_dir: &std::path::Path) -> AppContext {
        let mut config = AppConfig {
            base_url: base_url.to_string(),
            ..AppConfig::default()
        };
        config.scraping.image_dir = image_dir.to_path_buf();
        AppContext::new(
            config,
            Arc::new(InMemoryCatalogStore::default()),
            Arc::new(InMemoryPriceCache::default()),
            Arc::new(LogNotifier),
        )
    }

    #[test]
    fn test_query_defaults() {
        let command: ScrapeCommand = serde_json::from_str("{}").unwrap();
        assert_eq!(command, ScrapeCommand::default());
        assert_eq!(command.limit, 5);
        assert_eq!(command.max_retries, 3);
        assert_eq!(command.retry_delay, 5);
    }

    #[test]
    fn test_validation_bounds() {
        let zero_retries = ScrapeCommand {
            max_retries: 0,
            ..ScrapeCommand::default()
        };
        let err = zero_retries.validate().unwrap_err();
        assert!(err.is_client_error());
        assert!(err.to_string().contains("max_retries"));

        let zero_delay = ScrapeCommand {
            retry_delay: 0,
            ..ScrapeCommand::default()
        };
        assert!(zero_delay.validate().is_err());
        assert!(ScrapeCommand::default().validate().is_ok());
    }

    #[test]
    fn test_blank_proxy_means_direct() {
        let command = ScrapeCommand {
            proxy: "  ".to_string(),
            ..ScrapeCommand::default()
        };
        assert_eq!(command.settings("https://shop.test").proxy, None);

        let command = ScrapeCommand {
            proxy: "http://10.0.0.1:3128".to_string(),
            ..ScrapeCommand::default()
        };
        assert_eq!(
            command.settings("https://shop.test").proxy.as_deref(),
            Some("http://10.0.0.1:3128")
        );
    }

    #[test]
    fn test_message_response_shape() {
        let json = serde_json::to_value(ScrapeResponse::completed()).unwrap();
        assert_eq!(json, serde_json::json!({"message": "Scraping completed successfully!"}));
    }

    #[tokio::test]
    async fn test_invalid_proxy_is_a_client_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context("https://shop.test", dir.path());
        let command = ScrapeCommand {
            proxy: "ftp://proxy.local:21".to_string(),
            ..ScrapeCommand::default()
        };

        let err = execute_scrape(&ctx, &command).await.unwrap_err();
        assert!(err.is_client_error(), "unexpected error: {err}");
        assert!(matches!(err, CommandError::InvalidParameter { field: "proxy", .. }));
    }

    #[test]
    fn test_proxy_scheme_checked_before_any_request() {
        for proxy in ["ftp://proxy.local:21", "proxy.local:3128"] {
            let command = ScrapeCommand {
                proxy: proxy.to_string(),
                ..ScrapeCommand::default()
            };
            assert!(matches!(
                command.validate(),
                Err(CommandError::InvalidParameter { field: "proxy", .. })
            ));
        }

        let socks = ScrapeCommand {
            proxy: "socks5://127.0.0.1:1080".to_string(),
            ..ScrapeCommand::default()
        };
        assert!(socks.validate().is_ok());
    }

    #[tokio::test]
    async fn test_list_products_reads_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context("https://shop.test", dir.path());
        let record = ProductRecord::new("Widget", 10.0, None).unwrap();
        ctx.catalog.save_all(&[record.clone()]).await.unwrap();

        assert_eq!(list_products(&ctx).await.unwrap(), vec![record]);
    }
}
