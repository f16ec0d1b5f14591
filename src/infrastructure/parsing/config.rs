//! CSS selectors for product listing pages

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductListSelectors {
    /// Selectors for product containers; the first one matching anything wins
    pub product_container: Vec<String>,

    /// Product title, relative to the container
    pub title: String,

    /// Current (sale) price, relative to the container
    pub price: String,

    /// Thumbnail image element, relative to the container
    pub image: String,

    /// Image URL attributes in priority order (lazy-load first)
    pub image_attributes: Vec<String>,
}

impl Default for ProductListSelectors {
    fn default() -> Self {
        Self {
            product_container: vec![
                "ul.products > li.product".to_string(),
                ".products".to_string(),
            ],
            title: "h2.woo-loop-product__title a".to_string(),
            price: "span.price ins span.amount".to_string(),
            image: "div.mf-product-thumbnail img".to_string(),
            image_attributes: vec!["data-lazy-src".to_string(), "src".to_string()],
        }
    }
}
