//! Best-effort product image download
//!
//! One GET per image, no retry. The file is named after the last path segment
//! of the image URL and overwritten if it already exists.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::infrastructure::http_client::{HttpClient, HttpError};

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Image URL '{url}' has no usable file name")]
    InvalidUrl { url: String },

    #[error("Image download failed: {0}")]
    Http(#[from] HttpError),

    #[error("Failed to store image at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait ImageRetriever: Send + Sync {
    /// Download `url` and return the local path it was stored at
    async fn retrieve(&self, url: &str) -> Result<String, ImageError>;
}

pub struct HttpImageRetriever {
    client: HttpClient,
    image_dir: PathBuf,
}

impl HttpImageRetriever {
    pub fn new(client: HttpClient, image_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            image_dir: image_dir.into(),
        }
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }
}

/// Final non-empty path segment of the URL
pub fn image_file_name(url: &str) -> Result<String, ImageError> {
    let invalid = || ImageError::InvalidUrl {
        url: url.to_string(),
    };

    let parsed = Url::parse(url).map_err(|_| invalid())?;
    parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .filter(|name| *name != "." && *name != "..")
        .map(str::to_string)
        .ok_or_else(invalid)
}

#[async_trait]
impl ImageRetriever for HttpImageRetriever {
    async fn retrieve(&self, url: &str) -> Result<String, ImageError> {
        let file_name = image_file_name(url)?;
        let path = self.image_dir.join(&file_name);

        let body = self.client.get_bytes(url).await?;

        let io_err = |source| ImageError::Io {
            path: path.clone(),
            source,
        };
        tokio::fs::create_dir_all(&self.image_dir).await.map_err(io_err)?;
        tokio::fs::write(&path, &body).await.map_err(io_err)?;

        debug!("🖼️ Stored {} ({} bytes) at {:?}", url, body.len(), path);
        Ok(path.to_string_lossy().into_owned())
    }
}
