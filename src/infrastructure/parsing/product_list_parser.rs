//! Product list parser
//!
//! Turns one listing page into product candidates in document order. Every
//! container that lacks a required element, carries an unparseable price or
//! only a placeholder image is skipped, never the whole page.

use anyhow::{Result, anyhow};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::{ParseContext, ProductListSelectors, SkipReason};
use crate::domain::ProductRecord;

/// Currency markers stripped from the front of a price label
const CURRENCY_PREFIXES: &[&str] = &["₹", "Rs.", "INR", "$", "€", "£"];

/// What must remain once currency and separators are gone
static PRICE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(?:\.\d+)?$").expect("static price regex is valid"));

/// A container that passed every check that does not need the network
#[derive(Debug, Clone, PartialEq)]
pub struct ProductCandidate {
    pub title: String,
    pub price: f64,
    /// Absolute URL of the real (non-placeholder) image
    pub image_url: String,
}

/// Outcome of parsing one page
#[derive(Debug, Default)]
pub struct ListingParse {
    pub candidates: Vec<ProductCandidate>,
    /// Index of the container in the page and why it was dropped
    pub skipped: Vec<(usize, SkipReason)>,
}

impl ListingParse {
    pub fn containers(&self) -> usize {
        self.candidates.len() + self.skipped.len()
    }
}

pub struct ProductListParser {
    container_selectors: Vec<(String, Selector)>,
    title_selector: Selector,
    price_selector: Selector,
    image_selector: Selector,
    image_attributes: Vec<String>,
}

impl ProductListParser {
    /// Create a new product list parser with default selectors
    pub fn new() -> Result<Self> {
        Self::with_config(&ProductListSelectors::default())
    }

    /// Create parser with custom selector configuration
    pub fn with_config(selectors: &ProductListSelectors) -> Result<Self> {
        let container_selectors = selectors
            .product_container
            .iter()
            .map(|s| Ok((s.clone(), compile_selector(s)?)))
            .collect::<Result<Vec<_>>>()?;

        if container_selectors.is_empty() {
            return Err(anyhow!("At least one product container selector is required"));
        }

        if selectors.image_attributes.is_empty() {
            return Err(anyhow!("At least one image attribute is required"));
        }

        Ok(Self {
            container_selectors,
            title_selector: compile_selector(&selectors.title)?,
            price_selector: compile_selector(&selectors.price)?,
            image_selector: compile_selector(&selectors.image)?,
            image_attributes: selectors.image_attributes.clone(),
        })
    }

    pub fn parse(&self, html: &str, context: &ParseContext) -> ListingParse {
        let document = Html::parse_document(html);
        let mut outcome = ListingParse::default();

        let Some((selector_str, containers)) = self
            .container_selectors
            .iter()
            .map(|(s, selector)| (s, document.select(selector).collect::<Vec<_>>()))
            .find(|(_, elements)| !elements.is_empty())
        else {
            warn!("No product containers found on page {}", context.page_number);
            return outcome;
        };

        debug!(
            "Found {} product containers on page {} using '{}'",
            containers.len(),
            context.page_number,
            selector_str
        );

        for (index, element) in containers.iter().enumerate() {
            match self.extract_candidate(element, context) {
                Ok(candidate) => outcome.candidates.push(candidate),
                Err(reason) => {
                    debug!(
                        "Skipping product at index {} on page {}: {}",
                        index, context.page_number, reason
                    );
                    outcome.skipped.push((index, reason));
                }
            }
        }

        outcome
    }

    fn extract_candidate(
        &self,
        element: &ElementRef,
        context: &ParseContext,
    ) -> Result<ProductCandidate, SkipReason> {
        let title_elem = element.select(&self.title_selector).next();
        let price_elem = element.select(&self.price_selector).next();
        let image_elem = element.select(&self.image_selector).next();

        let title_elem = title_elem.ok_or(SkipReason::MissingTitle)?;
        let price_elem = price_elem.ok_or(SkipReason::MissingPrice)?;
        let image_elem = image_elem.ok_or(SkipReason::MissingImage)?;

        let title = collect_text(&title_elem);
        let price_text = collect_text(&price_elem);
        let price = clean_price(&price_text).ok_or(SkipReason::UnparseablePrice { text: price_text })?;

        // Validate before any image is downloaded for it
        ProductRecord::new(title.as_str(), price, None).map_err(SkipReason::InvalidRecord)?;

        let raw_image_url = self
            .image_attributes
            .iter()
            .filter_map(|attr| image_elem.value().attr(attr))
            .map(str::trim)
            .find(|value| !value.is_empty())
            .ok_or(SkipReason::MissingImage)?;

        if raw_image_url.starts_with("data:") {
            debug!("Skipping placeholder image for {}", title);
            return Err(SkipReason::PlaceholderImage);
        }

        let image_url = context.resolve(raw_image_url).ok_or(SkipReason::MissingImage)?;

        Ok(ProductCandidate {
            title,
            price,
            image_url,
        })
    }
}

fn compile_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow!("Invalid CSS selector '{}': {}", selector, e))
}

fn collect_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Strip currency symbols, whitespace and thousands separators, then parse
/// what is left as a whole. Anything else in the label makes it unparseable.
pub fn clean_price(text: &str) -> Option<f64> {
    let compact: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();
    let number = CURRENCY_PREFIXES
        .iter()
        .find_map(|prefix| compact.strip_prefix(*prefix))
        .unwrap_or(&compact);

    if !PRICE_NUMBER.is_match(number) {
        return None;
    }
    number.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn product_html(title: &str, price: &str, img_attrs: &str) -> String {
        format!(
            r#"<div class="products">
                <h2 class="woo-loop-product__title"><a href="/p">{title}</a></h2>
                <span class="price"><del><span class="amount">₹9,999</span></del><ins><span class="amount">{price}</span></ins></span>
                <div class="mf-product-thumbnail"><img {img_attrs}></div>
            </div>"#
        )
    }

    fn page(body: &str) -> String {
        format!("<html><body>{body}</body></html>")
    }

    fn ctx() -> ParseContext {
        ParseContext::new(1, "https://shop.test/store/page/1")
    }

    #[test]
    fn test_parser_creation() {
        assert!(ProductListParser::new().is_ok());
    }

    #[test]
    fn test_invalid_selector_is_rejected() {
        let selectors = ProductListSelectors {
            title: "h2[[".to_string(),
            ..ProductListSelectors::default()
        };
        assert!(ProductListParser::with_config(&selectors).is_err());
    }

    #[rstest]
    #[case("₹1,299.00", Some(1299.0))]
    #[case("$ 15", Some(15.0))]
    #[case("  10.5 ", Some(10.5))]
    #[case("Rs. 2,50,000", Some(250_000.0))]
    #[case("free", None)]
    #[case("", None)]
    #[case("-5", None)]
    #[case("-₹5", None)]
    #[case("12abc", None)]
    #[case("1.2.3", None)]
    #[case("Call 555-1234", None)]
    #[case("NaN", None)]
    fn test_clean_price(#[case] text: &str, #[case] expected: Option<f64>) {
        assert_eq!(clean_price(text), expected);
    }

    #[test]
    fn test_extracts_sale_price_and_lazy_image() {
        let html = page(&product_html(
            "  Widget ",
            "₹1,299.00",
            r#"src="data:image/svg+xml;base64,AAA" data-lazy-src="/img/widget.jpg""#,
        ));

        let parsed = ProductListParser::new().unwrap().parse(&html, &ctx());
        assert!(parsed.skipped.is_empty());
        assert_eq!(
            parsed.candidates,
            vec![ProductCandidate {
                title: "Widget".to_string(),
                price: 1299.0,
                image_url: "https://shop.test/img/widget.jpg".to_string(),
            }]
        );
    }

    #[test]
    fn test_falls_back_to_src_attribute() {
        let html = page(&product_html(
            "Gadget",
            "20",
            r#"data-lazy-src="" src="https://cdn.test/g.png""#,
        ));
        let parsed = ProductListParser::new().unwrap().parse(&html, &ctx());
        assert_eq!(parsed.candidates[0].image_url, "https://cdn.test/g.png");
    }

    #[test]
    fn test_placeholder_only_image_is_skipped() {
        let html = page(&product_html(
            "Widget",
            "10",
            r#"src="data:image/svg+xml;base64,AAA""#,
        ));
        let parsed = ProductListParser::new().unwrap().parse(&html, &ctx());
        assert!(parsed.candidates.is_empty());
        assert_eq!(parsed.skipped, vec![(0, SkipReason::PlaceholderImage)]);
    }

    #[test]
    fn test_skip_reasons() {
        let missing_title = r#"<div class="products">
                <span class="price"><ins><span class="amount">5</span></ins></span>
                <div class="mf-product-thumbnail"><img src="/a.jpg"></div>
            </div>"#;
        let html = page(&format!(
            "{}{}{}",
            missing_title,
            product_html("Bad price", "call us", r#"src="/b.jpg""#),
            product_html("Zero", "0.00", r#"src="/c.jpg""#),
        ));

        let parsed = ProductListParser::new().unwrap().parse(&html, &ctx());
        assert!(parsed.candidates.is_empty());
        assert_eq!(parsed.containers(), 3);
        assert_eq!(parsed.skipped[0], (0, SkipReason::MissingTitle));
        assert!(matches!(parsed.skipped[1], (1, SkipReason::UnparseablePrice { .. })));
        assert!(matches!(parsed.skipped[2], (2, SkipReason::InvalidRecord(_))));
    }

    #[test]
    fn test_negative_price_label_is_skipped() {
        let html = page(&product_html("Neg", "-₹5", r#"src="/n.jpg""#));
        let parsed = ProductListParser::new().unwrap().parse(&html, &ctx());
        assert!(parsed.candidates.is_empty());
        assert!(matches!(
            parsed.skipped[0],
            (0, SkipReason::UnparseablePrice { ref text }) if text == "-₹5"
        ));
    }

    #[test]
    fn test_woocommerce_list_markup() {
        let html = page(
            r#"<ul class="products">
                <li class="product">
                    <h2 class="woo-loop-product__title"><a>First</a></h2>
                    <span class="price"><ins><span class="amount">1</span></ins></span>
                    <div class="mf-product-thumbnail"><img src="/1.jpg"></div>
                </li>
                <li class="product">
                    <h2 class="woo-loop-product__title"><a>Second</a></h2>
                    <span class="price"><ins><span class="amount">2</span></ins></span>
                    <div class="mf-product-thumbnail"><img src="/2.jpg"></div>
                </li>
            </ul>"#,
        );
        let parsed = ProductListParser::new().unwrap().parse(&html, &ctx());
        let titles: Vec<_> = parsed.candidates.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second"]);
    }

    #[test]
    fn test_page_without_containers() {
        let parsed = ProductListParser::new()
            .unwrap()
            .parse("<html><body><p>Nothing here</p></body></html>", &ctx());
        assert_eq!(parsed.containers(), 0);
    }

    fn malformed(kind: u8, i: usize) -> String {
        match kind {
            1 => product_html(&format!("P{i}"), "n/a", r#"src="/x.jpg""#),
            2 => product_html(&format!("P{i}"), "5", r#"src="data:image/gif;base64,R0""#),
            3 => product_html(&format!("P{i}"), "5", ""),
            4 => product_html("   ", "5", r#"src="/x.jpg""#),
            _ => format!(
                r#"<div class="products"><h2 class="woo-loop-product__title"><a>P{i}</a></h2></div>"#
            ),
        }
    }

    proptest! {
        #[test]
        fn prop_returns_exactly_the_well_formed_products_in_order(kinds in prop::collection::vec(0u8..6, 0..24)) {
            let mut body = String::new();
            let mut expected = Vec::new();
            for (i, kind) in kinds.iter().enumerate() {
                if *kind == 0 {
                    let title = format!("Product {i}");
                    body.push_str(&product_html(&title, &format!("{}.50", i + 1), &format!(r#"src="/img/{i}.jpg""#)));
                    expected.push(title);
                } else {
                    body.push_str(&malformed(*kind, i));
                }
            }

            let parsed = ProductListParser::new().unwrap().parse(&page(&body), &ctx());
            let titles: Vec<String> = parsed.candidates.iter().map(|c| c.title.clone()).collect();
            prop_assert_eq!(titles, expected);
            prop_assert_eq!(parsed.containers(), kinds.len());
        }
    }
}
