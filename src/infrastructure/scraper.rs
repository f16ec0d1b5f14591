//! Page scraping: fetch one listing page and extract its records

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::ProductRecord;
use crate::infrastructure::config::ScrapingConfig;
use crate::infrastructure::http_client::{HttpClient, HttpClientConfig};
use crate::infrastructure::image_retriever::{HttpImageRetriever, ImageRetriever};
use crate::infrastructure::page_fetcher::{FetchError, PageFetcher};
use crate::infrastructure::parsing::{ParseContext, ProductListParser};
use crate::infrastructure::record_extractor::RecordExtractor;

#[async_trait]
pub trait PageScraper: Send + Sync {
    async fn scrape_page(&self, page_number: u32) -> Result<Vec<ProductRecord>, FetchError>;
}

/// Per-invocation scraping parameters
#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub base_url: String,
    pub proxy: Option<String>,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

pub struct ProductPageScraper {
    fetcher: PageFetcher,
    extractor: RecordExtractor,
}

impl ProductPageScraper {
    pub fn new(fetcher: PageFetcher, extractor: RecordExtractor) -> Self {
        Self { fetcher, extractor }
    }

    /// Wire the HTTP fetcher, parser and image downloader for one run
    pub fn from_settings(scraping: &ScrapingConfig, settings: &ScrapeSettings) -> Result<Self> {
        let client = HttpClient::with_config(&HttpClientConfig::from_scraping_config(
            scraping,
            settings.proxy.clone(),
        ))?;

        let fetcher = PageFetcher::new(
            client.clone(),
            &settings.base_url,
            settings.max_retries,
            settings.retry_delay,
        );
        let images: Arc<dyn ImageRetriever> =
            Arc::new(HttpImageRetriever::new(client, scraping.image_dir.clone()));
        let parser = ProductListParser::with_config(&scraping.selectors)?;

        Ok(Self::new(fetcher, RecordExtractor::new(parser, images)))
    }
}

#[async_trait]
impl PageScraper for ProductPageScraper {
    async fn scrape_page(&self, page_number: u32) -> Result<Vec<ProductRecord>, FetchError> {
        let body = self.fetcher.fetch(page_number).await?;
        let html = String::from_utf8_lossy(&body);
        let context = ParseContext::new(page_number, &self.fetcher.page_url(page_number));
        Ok(self.extractor.extract(&html, &context).await)
    }
}
