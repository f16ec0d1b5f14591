//! Product record scraped from a listing page
//!
//! A `ProductRecord` only exists if it passed validation; every path into the
//! pipeline (extraction, catalog load) goes through [`ProductRecord::new`].
//! Titles are stored as given. Extraction trims the scraped text itself.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum accepted title length, in characters
pub const MAX_TITLE_LEN: usize = 255;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProductValidationError {
    #[error("Product title is empty")]
    EmptyTitle,

    #[error("Product title is {len} characters long (max {MAX_TITLE_LEN})")]
    TitleTooLong { len: usize },

    #[error("Product price must be a positive number, got {price}")]
    NonPositivePrice { price: f64 },
}

/// Immutable product value. Identity for reconciliation is the title alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProductRecordData")]
pub struct ProductRecord {
    #[serde(rename = "product_title")]
    title: String,
    #[serde(rename = "product_price")]
    price: f64,
    #[serde(rename = "path_to_image")]
    image_path: Option<String>,
}

/// Unvalidated wire shape, used only to route deserialization through `new`
#[derive(Deserialize)]
struct ProductRecordData {
    product_title: String,
    product_price: f64,
    #[serde(default)]
    path_to_image: Option<String>,
}

impl TryFrom<ProductRecordData> for ProductRecord {
    type Error = ProductValidationError;

    fn try_from(data: ProductRecordData) -> Result<Self, Self::Error> {
        Self::new(data.product_title, data.product_price, data.path_to_image)
    }
}

impl ProductRecord {
    pub fn new(
        title: impl Into<String>,
        price: f64,
        image_path: Option<String>,
    ) -> Result<Self, ProductValidationError> {
        let title = title.into();

        if title.trim().is_empty() {
            return Err(ProductValidationError::EmptyTitle);
        }

        let len = title.chars().count();
        if len > MAX_TITLE_LEN {
            return Err(ProductValidationError::TitleTooLong { len });
        }

        if !price.is_finite() || price <= 0.0 {
            return Err(ProductValidationError::NonPositivePrice { price });
        }

        Ok(Self {
            title,
            price,
            image_path: image_path.filter(|p| !p.is_empty()),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn image_path(&self) -> Option<&str> {
        self.image_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_record_keeps_fields() {
        let record = ProductRecord::new("Widget", 10.0, Some("images/w.jpg".into())).unwrap();
        assert_eq!(record.title(), "Widget");
        assert_eq!(record.price(), 10.0);
        assert_eq!(record.image_path(), Some("images/w.jpg"));
    }

    #[test]
    fn test_empty_image_path_becomes_none() {
        let record = ProductRecord::new("Widget", 1.5, Some(String::new())).unwrap();
        assert_eq!(record.image_path(), None);
    }

    #[test]
    fn test_rejects_invalid_fields() {
        assert_eq!(
            ProductRecord::new("   ", 1.0, None),
            Err(ProductValidationError::EmptyTitle)
        );
        assert!(matches!(
            ProductRecord::new("x".repeat(256), 1.0, None),
            Err(ProductValidationError::TitleTooLong { len: 256 })
        ));
        assert!(ProductRecord::new("x".repeat(255), 1.0, None).is_ok());
        assert!(ProductRecord::new("Widget", 0.0, None).is_err());
        assert!(ProductRecord::new("Widget", -3.0, None).is_err());
        assert!(ProductRecord::new("Widget", f64::NAN, None).is_err());
    }

    #[test]
    fn test_serde_uses_catalog_field_names() {
        let record = ProductRecord::new("Widget", 10.0, Some("images/w.jpg".into())).unwrap();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "product_title": "Widget",
                "product_price": 10.0,
                "path_to_image": "images/w.jpg"
            })
        );
    }

    #[test]
    fn test_stored_title_whitespace_survives_round_trip() {
        let json = r#"{"product_title":" Widget ","product_price":10.0,"path_to_image":null}"#;
        let record: ProductRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.title(), " Widget ");
        assert_eq!(serde_json::to_string(&record).unwrap(), json);
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: ProductRecord =
            serde_json::from_str(r#"{"product_title":"Widget","product_price":12}"#).unwrap();
        assert_eq!(ok.image_path(), None);

        let bad = serde_json::from_str::<ProductRecord>(
            r#"{"product_title":"Widget","product_price":-1,"path_to_image":null}"#,
        );
        assert!(bad.is_err());
    }
}
