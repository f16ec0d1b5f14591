//! Infrastructure layer: configuration, HTTP, parsing, caching and storage
//!
//! Everything that talks to the network or the filesystem lives here, behind
//! the traits the application layer depends on.

pub mod config;
pub mod logging;
pub mod http_client;
pub mod retry;
pub mod parsing;
pub mod image_retriever;
pub mod page_fetcher;
pub mod record_extractor;
pub mod scraper;
pub mod price_cache;
pub mod catalog_store;

pub use config::{AppConfig, CacheBackend, ConfigError};
pub use http_client::{HttpClient, HttpClientConfig, HttpError};
pub use retry::{BackoffPolicy, FixedDelay, RetryState, Sleeper, TokioSleeper};
pub use parsing::{ParseContext, ProductListParser, ProductListSelectors, SkipReason};
pub use image_retriever::{HttpImageRetriever, ImageError, ImageRetriever};
pub use page_fetcher::{FetchError, PageFetcher};
pub use record_extractor::RecordExtractor;
pub use scraper::{PageScraper, ProductPageScraper, ScrapeSettings};
pub use price_cache::{CacheError, InMemoryPriceCache, PriceCache, SqlitePriceCache};
pub use catalog_store::{CatalogStore, InMemoryCatalogStore, JsonCatalogStore, StoreError};
pub use logging::{init_logging, init_logging_with_config};
