// src/crawl/mod.rs
// =============================================================================
// This module handles website crawling.
//
// Pieces:
// - scope:    which pages may be expanded (authority, optional path prefixes)
// - visited:  which URLs were already dispatched, and how they turned out
// - edge:     a link being followed, with the anchor that referenced it
// - frontier: the worker pool that drives the crawl to quiescence
// =============================================================================

mod edge;
mod frontier;
mod scope;
mod visited;

pub use edge::{is_http, resolve_edges, Edge};
pub use frontier::{CrawlSummary, Crawler, StopReason};
pub use scope::{authority_of, ScopeRule};
