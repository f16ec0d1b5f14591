//! Logging system configuration and initialization
//!
//! This module provides the logging setup with:
//! - Configuration based log level control (overridable with `RUST_LOG`)
//! - Structured JSON logging (optional)
//! - Console and daily-rolling file output
//! - Local timezone timestamps

use std::sync::Mutex;

use anyhow::{Result, anyhow};
use chrono::Local;
use once_cell::sync::Lazy;
use tracing::{Subscriber, info};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

pub use crate::infrastructure::config::LoggingConfig;

const LOG_FILE_PREFIX: &str = "catalog-ingest.log";

// Keeps the non-blocking file writers alive for the whole process
static LOG_GUARDS: Lazy<Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>>> =
    Lazy::new(|| Mutex::new(Vec::new()));

/// Local time formatter
struct LocalTimeFormatter;

impl FormatTime for LocalTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f %:z"))
    }
}

/// Initialize the logging system with default configuration
pub fn init_logging() -> Result<()> {
    init_logging_with_config(&LoggingConfig::default())
}

/// Build the env filter for the given configuration.
///
/// `RUST_LOG` wins when set. Otherwise noisy dependency targets are clamped
/// unless the requested level is `trace`:
/// ```bash
/// RUST_LOG="debug,sqlx::query=debug" catalog-ingest scrape
/// ```
pub fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut filter = EnvFilter::try_new(&config.level)
        .map_err(|e| anyhow!("Invalid log level '{}': {}", config.level, e))?;

    if !config.level.eq_ignore_ascii_case("trace") {
        for directive in [
            "sqlx::query=warn",
            "hyper=warn",
            "h2=warn",
            "html5ever=warn",
            "selectors=warn",
        ] {
            filter = filter.add_directive(directive.parse()?);
        }
    }

    for (target, level) in &config.module_filters {
        filter = filter.add_directive(format!("{target}={level}").parse()?);
    }

    filter = filter.add_directive(format!("catalog_ingest={}", config.level).parse()?);
    Ok(filter)
}

/// Stderr layer, built per subscriber stack it is added to
fn console_layer<S>(config: &LoggingConfig) -> Option<impl Layer<S>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    config.console_output.then(|| {
        fmt::Layer::new()
            .with_writer(std::io::stderr)
            .with_timer(LocalTimeFormatter)
            .with_target(false)
    })
}

/// Initialize logging with custom configuration
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    let env_filter = build_env_filter(config)?;
    let registry = Registry::default().with(env_filter);

    let file_writer = if config.file_output {
        std::fs::create_dir_all(&config.log_dir).map_err(|e| {
            anyhow!("Failed to create log directory {:?}: {}", config.log_dir, e)
        })?;
        let appender = rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
        let (writer, guard) = non_blocking(appender);
        LOG_GUARDS
            .lock()
            .map_err(|_| anyhow!("Log guard registry poisoned"))?
            .push(guard);
        Some(writer)
    } else {
        None
    };

    match (file_writer, config.json_format) {
        (Some(writer), true) => {
            let file_layer = fmt::Layer::new()
                .json()
                .with_writer(writer)
                .with_timer(LocalTimeFormatter)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false);
            registry
                .with(file_layer)
                .with(console_layer(config))
                .try_init()
                .map_err(|e| anyhow!("Failed to install subscriber: {}", e))?;
        }
        (Some(writer), false) => {
            let file_layer = fmt::Layer::new()
                .with_writer(writer)
                .with_timer(LocalTimeFormatter)
                .with_target(false)
                .with_ansi(false);
            registry
                .with(file_layer)
                .with(console_layer(config))
                .try_init()
                .map_err(|e| anyhow!("Failed to install subscriber: {}", e))?;
        }
        (None, _) => {
            if !config.console_output {
                return Err(anyhow!("No logging output configured"));
            }
            registry
                .with(console_layer(config))
                .try_init()
                .map_err(|e| anyhow!("Failed to install subscriber: {}", e))?;
        }
    }

    info!("Logging system initialized");
    info!("Log level: {}", config.level);
    info!("JSON format: {}", config.json_format);
    info!("File output: {} ({:?})", config.file_output, config.log_dir);

    Ok(())
}

/// Log system information for diagnostics
pub fn log_system_info() {
    info!("=== Catalog Ingest System Information ===");
    info!("Application version: {}", env!("CARGO_PKG_VERSION"));
    info!("Operating system: {}", std::env::consts::OS);
    info!("Architecture: {}", std::env::consts::ARCH);

    if let Ok(current_dir) = std::env::current_dir() {
        info!("Working directory: {:?}", current_dir);
    }
    info!("==========================================");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert!(!config.level.is_empty());
        assert!(config.console_output);
        assert!(!config.file_output);
    }

    #[test]
    fn test_console_layer_stacks_over_file_layer() {
        let config = LoggingConfig::default();
        let dir = tempfile::tempdir().unwrap();
        let (writer, _guard) = non_blocking(rolling::never(dir.path(), "test.log"));

        let console_only = Registry::default().with(console_layer(&config));
        tracing::subscriber::with_default(console_only, || info!("console only"));

        let file_layer = fmt::Layer::new()
            .json()
            .with_writer(writer)
            .with_timer(LocalTimeFormatter)
            .with_ansi(false);
        let both = Registry::default()
            .with(build_env_filter(&config).unwrap())
            .with(file_layer)
            .with(console_layer(&config));
        tracing::subscriber::with_default(both, || info!("file and console"));

        let disabled = LoggingConfig {
            console_output: false,
            ..LoggingConfig::default()
        };
        assert!(console_layer::<Registry>(&disabled).is_none());
    }

    #[test]
    fn test_env_filter_accepts_module_filters() {
        let mut config = LoggingConfig::default();
        config.module_filters.insert("scraper".into(), "error".into());
        assert!(build_env_filter(&config).is_ok());
    }

    #[test]
    fn test_env_filter_rejects_garbage_level() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LoggingConfig {
            level: "loud=please=now".to_string(),
            ..LoggingConfig::default()
        };
        assert!(build_env_filter(&config).is_err());
    }
}
