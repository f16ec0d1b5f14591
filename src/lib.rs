//! catalog-ingest: paginated product listing scraper
//!
//! Walks the listing pages of a storefront, extracts product records,
//! downloads their images, and appends every record whose price changed since
//! the last run to a JSON catalog. The last seen price per title lives in a
//! pluggable price cache.

pub mod domain;
pub mod infrastructure;
pub mod application;
pub mod commands;
pub mod server;

pub use application::{IngestionError, IngestionReport, IngestionService};
pub use commands::{AppContext, CommandError, ScrapeCommand, ScrapeResponse};
pub use domain::ProductRecord;
