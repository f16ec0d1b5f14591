//! Ingestion run: scrape pages, reconcile prices, append to the catalog
//!
//! A run walks pages `1..=page_limit` one after another. A page that cannot
//! be fetched contributes nothing and the run moves on. Cache and catalog
//! failures abort the run.
//!
//! Reconciliation reads the cache through an overlay of prices accepted
//! earlier in the same run, writes the catalog once, and only then flushes
//! the accepted prices to the cache. A failed catalog write therefore leaves
//! the cache untouched and the next run retries the same records.
//!
//! A cache write failing during the flush aborts the run after the catalog
//! is committed. Records whose price never reached the cache are appended
//! again by the next run, so the catalog may hold a duplicate entry for them.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::application::notifier::Notifier;
use crate::domain::ProductRecord;
use crate::infrastructure::catalog_store::{CatalogStore, StoreError};
use crate::infrastructure::price_cache::{CacheError, PriceCache};
use crate::infrastructure::scraper::PageScraper;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Totals for one run, plus the scraped records when requested
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestionReport {
    pub total_scraped: usize,
    pub total_updated: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scraped: Option<Vec<ProductRecord>>,
}

pub struct IngestionService {
    scraper: Arc<dyn PageScraper>,
    catalog: Arc<dyn CatalogStore>,
    cache: Arc<dyn PriceCache>,
    notifier: Arc<dyn Notifier>,
}

impl IngestionService {
    pub fn new(
        scraper: Arc<dyn PageScraper>,
        catalog: Arc<dyn CatalogStore>,
        cache: Arc<dyn PriceCache>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            scraper,
            catalog,
            cache,
            notifier,
        }
    }

    pub async fn run(
        &self,
        page_limit: u32,
        return_scraped: bool,
    ) -> Result<IngestionReport, IngestionError> {
        info!("🚀 Starting ingestion run over {} pages", page_limit);

        let all_products = self.scrape_pages(page_limit).await;
        let total_scraped = all_products.len();
        let total_updated = self.reconcile(&all_products).await?;

        if let Err(e) = self.notifier.notify(total_scraped, total_updated).await {
            warn!("⚠️ Notification failed: {:#}", e);
        }

        info!(
            "✅ Ingestion finished: {} scraped, {} updated",
            total_scraped, total_updated
        );

        Ok(IngestionReport {
            total_scraped,
            total_updated,
            scraped: return_scraped.then_some(all_products),
        })
    }

    /// The persisted catalog as it currently stands
    pub async fn all_products(&self) -> Result<Vec<ProductRecord>, IngestionError> {
        Ok(self.catalog.load_all().await?)
    }

    async fn scrape_pages(&self, page_limit: u32) -> Vec<ProductRecord> {
        let mut all_products = Vec::new();
        for page in 1..=page_limit {
            match self.scraper.scrape_page(page).await {
                Ok(records) => all_products.extend(records),
                Err(e) => error!("❌ Skipping page {}: {}", page, e),
            }
        }
        all_products
    }

    /// Returns the number of records appended to the catalog
    async fn reconcile(&self, incoming: &[ProductRecord]) -> Result<usize, IngestionError> {
        let mut catalog = self.catalog.load_all().await?;
        let mut pending: HashMap<&str, f64> = HashMap::new();
        let mut accepted: Vec<&ProductRecord> = Vec::new();

        for record in incoming {
            let cached = match pending.get(record.title()) {
                Some(price) => Some(*price),
                None => self.cache.get(record.title()).await?,
            };

            if cached == Some(record.price()) {
                continue;
            }

            pending.insert(record.title(), record.price());
            accepted.push(record);
        }

        catalog.extend(accepted.iter().map(|record| (*record).clone()));
        self.catalog.save_all(&catalog).await?;

        for record in &accepted {
            self.cache.put(record.title(), record.price()).await?;
        }

        Ok(accepted.len())
    }
}
