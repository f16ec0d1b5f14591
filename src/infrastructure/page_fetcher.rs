//! Listing page fetcher
//!
//! Fetches `{base_url}/page/{n}` with a fixed-delay bounded retry. Any
//! transport error or non-2xx status counts as a failed attempt.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;
use tracing::info;

use crate::infrastructure::http_client::{HttpClient, HttpError};
use crate::infrastructure::retry::{BackoffPolicy, FixedDelay, Sleeper, TokioSleeper, retry_with};

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to scrape page {page} after {attempts} attempts: {source}")]
    Exhausted {
        page: u32,
        attempts: u32,
        #[source]
        source: HttpError,
    },
}

impl FetchError {
    pub fn page(&self) -> u32 {
        match self {
            Self::Exhausted { page, .. } => *page,
        }
    }
}

pub struct PageFetcher {
    client: HttpClient,
    base_url: String,
    policy: Box<dyn BackoffPolicy>,
    sleeper: Arc<dyn Sleeper>,
}

impl PageFetcher {
    /// Fetcher with a fixed delay between attempts, sleeping on the tokio timer
    pub fn new(client: HttpClient, base_url: &str, max_retries: u32, retry_delay: Duration) -> Self {
        Self::with_policy(
            client,
            base_url,
            Box::new(FixedDelay::new(max_retries, retry_delay)),
            Arc::new(TokioSleeper),
        )
    }

    pub fn with_policy(
        client: HttpClient,
        base_url: &str,
        policy: Box<dyn BackoffPolicy>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            policy,
            sleeper,
        }
    }

    pub fn page_url(&self, page_number: u32) -> String {
        format!("{}/page/{}", self.base_url, page_number)
    }

    pub async fn fetch(&self, page_number: u32) -> Result<Bytes, FetchError> {
        let url = self.page_url(page_number);
        let label = format!("scraping page {page_number}");
        info!("🔄 Fetching page {}: {}", page_number, url);

        retry_with(self.policy.as_ref(), self.sleeper.as_ref(), &label, |_attempt| {
            self.client.get_bytes(&url)
        })
        .await
        .map_err(|exhausted| FetchError::Exhausted {
            page: page_number,
            attempts: exhausted.attempts,
            source: exhausted.last_error,
        })
    }
}
