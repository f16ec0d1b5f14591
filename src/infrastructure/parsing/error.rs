//! Per-product skip decisions
//!
//! These are not errors: a skipped candidate is a normal extraction outcome
//! and is only ever logged.

use thiserror::Error;

use crate::domain::ProductValidationError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SkipReason {
    #[error("title element missing")]
    MissingTitle,

    #[error("price element missing")]
    MissingPrice,

    #[error("image element or image URL missing")]
    MissingImage,

    #[error("price '{text}' is not a number")]
    UnparseablePrice { text: String },

    #[error("placeholder image only")]
    PlaceholderImage,

    #[error("invalid record: {0}")]
    InvalidRecord(ProductValidationError),

    #[error("image download failed: {0}")]
    ImageFailed(String),
}
