// src/config.rs
// =============================================================================
// Everything a crawl needs to know before it starts.
//
// CrawlConfig is built from a seed URL and then tuned with the with_*()
// methods. validate() is the one place where a configuration can be rejected;
// the crawler calls it before doing any network work.
//
// Defaults:
// - request timeout: 10 seconds (always finite)
// - workers:         8
// - redirects:       up to 10
// - no depth, page or wall-clock limit
// =============================================================================

use std::time::Duration;

use url::Url;

use crate::crawl::ScopeRule;
use crate::error::ConfigError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_WORKERS: usize = 8;
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

pub fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub seed: Url,
    /// Path prefixes limiting expansion; empty means the whole authority
    pub prefixes: Vec<String>,
    /// Pages deeper than this (seed = 0) are checked but not expanded
    pub max_depth: Option<usize>,
    /// Stop dispatching after this many fetches
    pub max_pages: Option<usize>,
    /// Stop dispatching after this much wall-clock time
    pub max_time: Option<Duration>,
    /// Per-request timeout
    pub timeout: Duration,
    pub workers: usize,
    pub max_redirects: usize,
    pub user_agent: String,
}

impl CrawlConfig {
    /// Parses the seed and fills in defaults for everything else.
    pub fn new(seed: &str) -> Result<Self, ConfigError> {
        let seed = parse_seed(seed)?;

        Ok(Self {
            seed,
            prefixes: Vec::new(),
            max_depth: None,
            max_pages: None,
            max_time: None,
            timeout: DEFAULT_TIMEOUT,
            workers: DEFAULT_WORKERS,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: default_user_agent(),
        })
    }

    pub fn with_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.prefixes = prefixes;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_max_pages(mut self, pages: usize) -> Self {
        self.max_pages = Some(pages);
        self
    }

    pub fn with_max_time(mut self, max_time: Duration) -> Self {
        self.max_time = Some(max_time);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Checks the configuration and derives the scope rule from it.
    pub fn validate(&self) -> Result<ScopeRule, ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        ScopeRule::from_seed(&self.seed, self.prefixes.clone())
    }
}

fn parse_seed(seed: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(seed.trim()).map_err(|e| ConfigError::InvalidSeed {
        url: seed.to_string(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::UnsupportedScheme(seed.to_string()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::MissingAuthority(seed.to_string()));
    }

    Ok(url)
}
