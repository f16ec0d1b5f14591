//! Price cache: last known price per product title
//!
//! Backend failures are never swallowed. A stored value that does not parse
//! as a number reads as "no cached price".

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::infrastructure::config::{CacheBackend, CacheConfig};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Price cache connection failed: {0}")]
    Connection(String),

    #[error("Price cache command failed: {0}")]
    Command(String),

    #[error("Price cache backend '{0:?}' is not available in this build")]
    Unsupported(CacheBackend),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        Self::Command(e.to_string())
    }
}

#[async_trait]
pub trait PriceCache: Send + Sync {
    async fn get(&self, title: &str) -> Result<Option<f64>, CacheError>;
    async fn put(&self, title: &str, price: f64) -> Result<(), CacheError>;
}

/// Text form stored in the backend; `f64` display round-trips through parsing
pub fn encode_price(price: f64) -> String {
    price.to_string()
}

pub fn decode_price(title: &str, raw: &str) -> Option<f64> {
    match raw.trim().parse::<f64>() {
        Ok(price) => Some(price),
        Err(_) => {
            warn!("Ignoring unparseable cached price {:?} for '{}'", raw, title);
            None
        }
    }
}

/// Open the backend selected in configuration
pub async fn connect(config: &CacheConfig) -> Result<Arc<dyn PriceCache>, CacheError> {
    info!("🗄️ Opening {:?} price cache", config.backend);
    match config.backend {
        CacheBackend::Memory => Ok(Arc::new(InMemoryPriceCache::default())),
        CacheBackend::Sqlite => Ok(Arc::new(SqlitePriceCache::connect(&config.url).await?)),
        #[cfg(feature = "redis")]
        CacheBackend::Redis => Ok(Arc::new(redis_cache::RedisPriceCache::connect(&config.url).await?)),
        #[cfg(not(feature = "redis"))]
        CacheBackend::Redis => Err(CacheError::Unsupported(CacheBackend::Redis)),
    }
}

#[derive(Debug, Default)]
pub struct InMemoryPriceCache {
    entries: RwLock<HashMap<String, f64>>,
}

impl InMemoryPriceCache {
    pub async fn snapshot(&self) -> HashMap<String, f64> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl PriceCache for InMemoryPriceCache {
    async fn get(&self, title: &str) -> Result<Option<f64>, CacheError> {
        Ok(self.entries.read().await.get(title).copied())
    }

    async fn put(&self, title: &str, price: f64) -> Result<(), CacheError> {
        self.entries.write().await.insert(title.to_string(), price);
        Ok(())
    }
}

/// SQLite-backed cache, one row per distinct title
#[derive(Clone)]
pub struct SqlitePriceCache {
    pool: SqlitePool,
}

impl SqlitePriceCache {
    pub async fn connect(database_url: &str) -> Result<Self, CacheError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| CacheError::Connection(e.to_string()))?
            .create_if_missing(true);

        // in-memory databases exist per connection
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        let cache = Self { pool };
        cache.ensure_schema().await?;
        Ok(cache)
    }

    async fn ensure_schema(&self) -> Result<(), CacheError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS price_cache (
                title TEXT PRIMARY KEY NOT NULL,
                price TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl PriceCache for SqlitePriceCache {
    async fn get(&self, title: &str) -> Result<Option<f64>, CacheError> {
        let raw: Option<String> = sqlx::query_scalar("SELECT price FROM price_cache WHERE title = ?")
            .bind(title)
            .fetch_optional(&self.pool)
            .await?;

        Ok(raw.and_then(|raw| decode_price(title, &raw)))
    }

    async fn put(&self, title: &str, price: f64) -> Result<(), CacheError> {
        sqlx::query(
            r"
            INSERT INTO price_cache (title, price, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(title) DO UPDATE SET price = excluded.price, updated_at = excluded.updated_at
            ",
        )
        .bind(title)
        .bind(encode_price(price))
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!("Cached price {} for '{}'", price, title);
        Ok(())
    }
}

#[cfg(feature = "redis")]
pub mod redis_cache {
    //! Redis-backed cache: plain `GET`/`SET` keyed by the exact title

    use async_trait::async_trait;
    use redis::AsyncCommands;
    use redis::aio::MultiplexedConnection;

    use super::{CacheError, PriceCache, decode_price, encode_price};

    #[derive(Clone)]
    pub struct RedisPriceCache {
        connection: MultiplexedConnection,
    }

    impl RedisPriceCache {
        pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
            let client =
                redis::Client::open(redis_url).map_err(|e| CacheError::Connection(e.to_string()))?;
            let connection = client
                .get_multiplexed_async_connection()
                .await
                .map_err(|e| CacheError::Connection(e.to_string()))?;
            Ok(Self { connection })
        }
    }

    #[async_trait]
    impl PriceCache for RedisPriceCache {
        async fn get(&self, title: &str) -> Result<Option<f64>, CacheError> {
            let mut conn = self.connection.clone();
            let raw: Option<String> = conn
                .get(title)
                .await
                .map_err(|e| CacheError::Command(e.to_string()))?;
            Ok(raw.and_then(|raw| decode_price(title, &raw)))
        }

        async fn put(&self, title: &str, price: f64) -> Result<(), CacheError> {
            let mut conn = self.connection.clone();
            conn.set::<_, _, ()>(title, encode_price(price))
                .await
                .map_err(|e| CacheError::Command(e.to_string()))
        }
    }
}
