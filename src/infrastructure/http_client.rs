//! HTTP client for page and image fetching
//!
//! A thin wrapper over `reqwest::Client` carrying the fixed identifying
//! user agent, an optional proxy and a per-request deadline. Retrying is not
//! done here; see [`crate::infrastructure::retry`].

use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client, ClientBuilder, Proxy, StatusCode};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::infrastructure::config::{ScrapingConfig, defaults};

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Failed to create HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("Invalid proxy '{proxy}': {reason}")]
    InvalidProxy { proxy: String, reason: String },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP error {status}: {url}")]
    Status { status: StatusCode, url: String },
}

/// Configuration for HTTP client behavior
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// User agent string
    pub user_agent: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Proxy URL applied to every scheme; `None` or empty means direct
    pub proxy: Option<String>,
}

impl HttpClientConfig {
    pub fn from_scraping_config(scraping: &ScrapingConfig, proxy: Option<String>) -> Self {
        Self {
            user_agent: scraping.user_agent.clone(),
            timeout_seconds: scraping.request_timeout_seconds,
            proxy,
        }
    }
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::USER_AGENT.to_string(),
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            proxy: None,
        }
    }
}

/// Proxy schemes the client can route through
pub const PROXY_SCHEMES: &[&str] = &["http", "https", "socks5", "socks5h"];

fn invalid_proxy(proxy: &str, reason: impl Into<String>) -> HttpError {
    HttpError::InvalidProxy {
        proxy: proxy.to_string(),
        reason: reason.into(),
    }
}

/// Check that `proxy` is an absolute URL with a supported scheme and a host
pub fn validate_proxy(proxy: &str) -> Result<(), HttpError> {
    let url = Url::parse(proxy.trim()).map_err(|e| invalid_proxy(proxy, e.to_string()))?;

    if !PROXY_SCHEMES.contains(&url.scheme()) {
        return Err(invalid_proxy(
            proxy,
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid_proxy(proxy, "missing host"));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn with_config(config: &HttpClientConfig) -> Result<Self, HttpError> {
        let mut builder = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .gzip(true);

        if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            validate_proxy(proxy)?;
            let proxy_cfg = Proxy::all(proxy).map_err(|e| invalid_proxy(proxy, e.to_string()))?;
            builder = builder.proxy(proxy_cfg);
            debug!("🔀 Routing requests through proxy {}", proxy);
        } else {
            // no proxy means direct, environment proxies included
            builder = builder.no_proxy();
        }

        let client = builder.build().map_err(HttpError::Build)?;
        Ok(Self { client })
    }

    /// One GET; non-2xx statuses are errors
    pub async fn get_bytes(&self, url: &str) -> Result<Bytes, HttpError> {
        debug!("🌐 HTTP GET {}", url);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                status,
                url: url.to_string(),
            });
        }

        Ok(response.bytes().await?)
    }
}
