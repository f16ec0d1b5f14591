//! Domain module - core business entities
//!
//! Records are validated on construction; nothing here touches I/O.

pub mod product;

pub use product::{ProductRecord, ProductValidationError, MAX_TITLE_LEN};
