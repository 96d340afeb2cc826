// src/checker/mod.rs
// =============================================================================
// This module contains everything needed to check a single link.
//
// Submodules:
// - http:   fetches a URL (the Fetcher trait and its reqwest implementation)
// - status: decides whether a fetch outcome means the link is broken
// - html:   extracts anchors from HTML pages
//
// The crawler (src/crawl/) glues these together; nothing in here knows about
// queues, scope or other pages.
// =============================================================================

mod html;
mod http;
mod status;

pub use html::{Anchor, HtmlLinkExtractor, LinkExtractor, PageLinks};
pub use http::{FetchError, FetchResult, Fetcher, HttpFetcher};
pub use status::{classify_status, BrokenStatus, LinkStatus, TransportErrorKind};
