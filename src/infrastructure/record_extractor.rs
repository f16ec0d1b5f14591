//! Record extraction: listing HTML in, validated product records out
//!
//! Parsing happens first and synchronously (the parsed document is not
//! `Send`), then each candidate's image is downloaded in document order.
//! A candidate whose image cannot be stored is dropped.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::ProductRecord;
use crate::infrastructure::image_retriever::ImageRetriever;
use crate::infrastructure::parsing::{ParseContext, ProductListParser, SkipReason};

pub struct RecordExtractor {
    parser: ProductListParser,
    images: Arc<dyn ImageRetriever>,
}

impl RecordExtractor {
    pub fn new(parser: ProductListParser, images: Arc<dyn ImageRetriever>) -> Self {
        Self { parser, images }
    }

    pub async fn extract(&self, html: &str, context: &ParseContext) -> Vec<ProductRecord> {
        let parsed = self.parser.parse(html, context);
        let containers = parsed.containers();
        let mut skipped = parsed.skipped.len();
        let mut records = Vec::with_capacity(parsed.candidates.len());

        for candidate in parsed.candidates {
            let image_path = match self.images.retrieve(&candidate.image_url).await {
                Ok(path) => path,
                Err(e) => {
                    let reason = SkipReason::ImageFailed(e.to_string());
                    debug!("Skipping '{}' on page {}: {}", candidate.title, context.page_number, reason);
                    skipped += 1;
                    continue;
                }
            };

            match ProductRecord::new(candidate.title, candidate.price, Some(image_path)) {
                Ok(record) => records.push(record),
                Err(e) => {
                    debug!("Skipping product on page {}: {}", context.page_number, SkipReason::InvalidRecord(e));
                    skipped += 1;
                }
            }
        }

        info!(
            "📄 Page {}: {} containers, {} products extracted, {} skipped",
            context.page_number,
            containers,
            records.len(),
            skipped
        );
        records
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::infrastructure::image_retriever::ImageError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Pretends to store every image except URLs containing "broken"
    #[derive(Debug, Default)]
    pub struct StubImageRetriever {
        pub requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ImageRetriever for StubImageRetriever {
        async fn retrieve(&self, url: &str) -> Result<String, ImageError> {
            self.requested.lock().unwrap().push(url.to_string());
            if url.contains("broken") {
                return Err(ImageError::InvalidUrl {
                    url: url.to_string(),
                });
            }
            let name = url.rsplit('/').next().unwrap_or_default();
            Ok(format!("images/{name}"))
        }
    }
}
