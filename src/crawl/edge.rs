// src/crawl/edge.rs
// =============================================================================
// An Edge is one link being followed: where it points, and which anchor on
// which page pointed there. Edges travel through the frontier so that a
// broken target can always be reported together with its referrer.
// =============================================================================

use tracing::debug;
use url::Url;

use crate::checker::{Anchor, PageLinks};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// Absolute target URL
    pub target: Url,
    /// Absolute URL of the page that contains the anchor
    pub source_page: Url,
    /// The href exactly as written
    pub anchor_href: String,
    /// Anchor text, possibly empty
    pub anchor_text: String,
}

/// Only http and https targets are ever fetched.
pub fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Resolves the anchors of a page into edges.
///
/// `page` is the page the anchors were found on (after redirects). A
/// `<base href>` in the document, when it resolves, replaces `page` as the
/// base for relative hrefs. Anchors whose href cannot be resolved at all
/// are dropped.
pub fn resolve_edges(page: &Url, links: PageLinks) -> Vec<Edge> {
    let base = links
        .base_href
        .as_deref()
        .and_then(|href| page.join(href).ok())
        .unwrap_or_else(|| page.clone());

    links
        .anchors
        .into_iter()
        .filter_map(|Anchor { href, text }| match base.join(href.trim()) {
            Ok(target) => Some(Edge {
                target,
                source_page: page.clone(),
                anchor_href: href,
                anchor_text: text,
            }),
            Err(e) => {
                debug!(page = %page, href = %href, error = %e, "unresolvable href");
                None
            }
        })
        .collect()
}
