// src/checker/html.rs
// =============================================================================
// This module extracts anchors from HTML pages.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever, which recovers from malformed markup instead of
//   failing, so a broken page yields fewer anchors, never an error
//
// Only the raw (href, text) pairs come out of here. Resolving them into
// absolute URLs is the crawler's job (see crawl/edge.rs).
// =============================================================================

use scraper::{ElementRef, Html, Selector};

/// One `<a>` element as written in the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// The href attribute exactly as written
    pub href: String,
    /// Text content of the element, whitespace collapsed (may be empty)
    pub text: String,
}

impl Anchor {
    pub fn new(href: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            text: text.into(),
        }
    }
}

/// Everything the crawler needs from one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLinks {
    /// Value of `<base href>`, if the document declares one
    pub base_href: Option<String>,
    pub anchors: Vec<Anchor>,
}

/// Pulls anchors out of a document.
pub trait LinkExtractor: Send + Sync {
    fn extract(&self, html: &str) -> PageLinks;
}

/// scraper-backed extractor.
#[derive(Debug, Clone)]
pub struct HtmlLinkExtractor {
    anchor: Selector,
    base: Selector,
}

impl HtmlLinkExtractor {
    pub fn new() -> Self {
        // Both selectors are constants, so parsing cannot fail at runtime.
        Self {
            anchor: Selector::parse("a[href]").unwrap(),
            base: Selector::parse("base[href]").unwrap(),
        }
    }
}

impl Default for HtmlLinkExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkExtractor for HtmlLinkExtractor {
    fn extract(&self, html: &str) -> PageLinks {
        let document = Html::parse_document(html);

        let base_href = document
            .select(&self.base)
            .next()
            .and_then(|e| e.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .map(str::to_string);

        let anchors = document
            .select(&self.anchor)
            .filter_map(|element| {
                let href = element.value().attr("href")?;
                if href.trim().is_empty() {
                    return None;
                }
                Some(Anchor::new(href, anchor_text(element)))
            })
            .collect();

        PageLinks { base_href, anchors }
    }
}

// Concatenated text of the element and its children, with runs of
// whitespace collapsed to a single space.
fn anchor_text(element: ElementRef<'_>) -> String {
    let raw: String = element.text().collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
