//! Context information for parsing one listing page

use url::Url;

#[derive(Debug, Clone)]
pub struct ParseContext {
    /// Page being parsed
    pub page_number: u32,

    /// URL the page was fetched from, used to resolve relative image links
    pub page_url: Option<Url>,
}

impl ParseContext {
    pub fn new(page_number: u32, page_url: &str) -> Self {
        Self {
            page_number,
            page_url: Url::parse(page_url).ok(),
        }
    }

    /// Context without a source URL; relative image links cannot be resolved
    pub fn detached(page_number: u32) -> Self {
        Self {
            page_number,
            page_url: None,
        }
    }

    /// Resolve `href` against the page URL; absolute links pass through
    pub fn resolve(&self, href: &str) -> Option<String> {
        if let Ok(url) = Url::parse(href) {
            return Some(url.to_string());
        }
        self.page_url
            .as_ref()
            .and_then(|base| base.join(href).ok())
            .map(|url| url.to_string())
    }
}
