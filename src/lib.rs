//! Broken-link crawler.
//!
//! Starting from a seed URL, [`Crawler`] follows every link reachable from
//! pages inside a [`ScopeRule`], checks the status of each target and hands
//! a [`BrokenLinkRecord`] to a [`Reporter`] for every link that leads to an
//! error status or cannot be reached at all.
//!
//! ```no_run
//! use std::sync::Arc;
//! use link_sentry::{CrawlConfig, Crawler, MemoryReporter};
//!
//! # async fn demo() -> link_sentry::Result<()> {
//! let reporter = Arc::new(MemoryReporter::new());
//! let config = CrawlConfig::new("https://example.com/docs/")?
//!     .with_prefixes(vec!["/docs".to_string()]);
//!
//! let summary = Crawler::new(config, reporter.clone())?.run().await?;
//! for record in reporter.sorted() {
//!     println!("{} {} <- {}", record.status, record.url, record.referrer_page);
//! }
//! println!("{} pages fetched", summary.pages_fetched);
//! # Ok(())
//! # }
//! ```

pub mod checker;
pub mod config;
pub mod crawl;
pub mod error;
pub mod report;

pub use checker::{BrokenStatus, FetchError, FetchResult, Fetcher, LinkExtractor};
pub use config::CrawlConfig;
pub use crawl::{CrawlSummary, Crawler, ScopeRule, StopReason};
pub use error::{ConfigError, CrawlError, Result};
pub use report::{BrokenLinkRecord, ChannelReporter, MemoryReporter, Reporter};
