//! HTML parsing infrastructure for product listing pages
//!
//! Parsing is synchronous and never fails a page: each product container
//! either yields a [`ProductCandidate`] or a [`SkipReason`].

pub mod config;
pub mod context;
pub mod error;
pub mod product_list_parser;

pub use config::ProductListSelectors;
pub use context::ParseContext;
pub use error::SkipReason;
pub use product_list_parser::{ListingParse, ProductCandidate, ProductListParser};
