//! Catalog persistence
//!
//! The catalog is one JSON array of product records. It is always read and
//! written whole; entries are only ever appended by the ingestion service.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::domain::ProductRecord;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Catalog file {path:?} is not a valid product list: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Catalog I/O failed at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn load_all(&self) -> Result<Vec<ProductRecord>, StoreError>;

    /// Replace the stored catalog with `records`, in order
    async fn save_all(&self, records: &[ProductRecord]) -> Result<(), StoreError>;
}

pub struct JsonCatalogStore {
    path: PathBuf,
    // serializes writers within this process
    write_lock: Mutex<()>,
}

impl JsonCatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "catalog.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn write_atomically(&self, bytes: &[u8]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, bytes).await.map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| self.io_error(e))
    }
}

/// Pretty JSON with four-space indentation
pub fn to_catalog_json(records: &[ProductRecord]) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    records.serialize(&mut serializer)?;
    Ok(buf)
}

#[async_trait]
impl CatalogStore for JsonCatalogStore {
    async fn load_all(&self) -> Result<Vec<ProductRecord>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("📁 Catalog {:?} not found, starting an empty one", self.path);
                let _guard = self.write_lock.lock().await;
                self.write_atomically(b"[]").await?;
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let records: Vec<ProductRecord> =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Malformed {
                path: self.path.clone(),
                source,
            })?;
        debug!("Loaded {} catalog entries from {:?}", records.len(), self.path);
        Ok(records)
    }

    async fn save_all(&self, records: &[ProductRecord]) -> Result<(), StoreError> {
        let bytes = to_catalog_json(records).map_err(|source| StoreError::Malformed {
            path: self.path.clone(),
            source,
        })?;

        let _guard = self.write_lock.lock().await;
        self.write_atomically(&bytes).await?;
        info!("💾 Saved {} catalog entries to {:?}", records.len(), self.path);
        Ok(())
    }
}

/// Catalog held in memory, for tests and dry runs
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    records: RwLock<Vec<ProductRecord>>,
}

impl InMemoryCatalogStore {
    pub fn with_records(records: Vec<ProductRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn load_all(&self) -> Result<Vec<ProductRecord>, StoreError> {
        Ok(self.records.read().await.clone())
    }

    async fn save_all(&self, records: &[ProductRecord]) -> Result<(), StoreError> {
        *self.records.write().await = records.to_vec();
        Ok(())
    }
}
