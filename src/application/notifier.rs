//! Run summary reporting

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, total_scraped: usize, total_updated: usize) -> Result<()>;
}

/// Writes the run summary to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

pub fn summary_message(total_scraped: usize, total_updated: usize) -> String {
    format!("Scraped {total_scraped} products. Updated {total_updated} products.")
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, total_scraped: usize, total_updated: usize) -> Result<()> {
        info!("📢 {}", summary_message(total_scraped, total_updated));
        Ok(())
    }
}
