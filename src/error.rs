// src/error.rs
// =============================================================================
// Error types for the crawler library.
//
// Only two kinds of failure ever leave the crate:
// - ConfigError: the crawl cannot start (bad seed, zero workers, ...)
// - CrawlError: something went wrong in the machinery itself
//
// A dead link, a timeout or a page of garbage HTML is NOT an error here.
// Those are results, and they travel through the Reporter as records.
// =============================================================================

use thiserror::Error;

/// Problems with the crawl configuration. All of them are fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid seed URL '{url}': {reason}")]
    InvalidSeed { url: String, reason: String },

    #[error("seed URL '{0}' must use http or https")]
    UnsupportedScheme(String),

    #[error("seed URL '{0}' has no host to scope the crawl to")]
    MissingAuthority(String),

    #[error("invalid path prefix '{0}'")]
    InvalidPrefix(String),

    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
}

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("crawl worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CrawlError>;
