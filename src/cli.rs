// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API: the CLI structure is plain Rust structs and enums,
// and the #[...] attributes tell clap how to parse them.
// =============================================================================

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};

use link_sentry::config::{DEFAULT_MAX_REDIRECTS, DEFAULT_WORKERS};
use link_sentry::{ConfigError, CrawlConfig};

#[derive(Parser, Debug)]
#[command(
    name = "link-sentry",
    version,
    about = "Crawl a website and report every broken link",
    long_about = "link-sentry starts from a seed URL, follows every link on pages inside the \
                  crawl scope, and reports each link that leads to an error status or an \
                  unreachable host, together with the page and anchor that referenced it."
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides this.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl a site starting from a seed URL
    ///
    /// Example: link-sentry crawl https://example.com/docs/ --prefix /docs
    Crawl(CrawlArgs),
}

#[derive(Args, Debug)]
pub struct CrawlArgs {
    /// Seed URL to start crawling from (http or https)
    pub seed: String,

    /// Only expand pages whose path starts with this prefix (repeatable).
    /// Without any prefix, every page on the seed's host is expanded.
    #[arg(long = "prefix", value_name = "PATH")]
    pub prefixes: Vec<String>,

    /// Do not expand pages more than this many links away from the seed
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Stop after fetching this many pages
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Stop after this many seconds of crawling
    #[arg(long, value_name = "SECS")]
    pub max_time: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 10)]
    pub timeout: u64,

    /// Number of concurrent fetch workers
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Maximum number of redirects to follow per request
    #[arg(long, default_value_t = DEFAULT_MAX_REDIRECTS)]
    pub max_redirects: usize,

    /// User-Agent header sent with every request
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Print broken links as JSON lines instead of a table
    #[arg(long)]
    pub json: bool,

    /// Also stream broken links as JSON lines into this file
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl CrawlArgs {
    /// Maps the flags onto a crawl configuration.
    pub fn to_config(&self) -> Result<CrawlConfig, ConfigError> {
        let mut config = CrawlConfig::new(&self.seed)?
            .with_prefixes(self.prefixes.clone())
            .with_timeout(Duration::from_secs(self.timeout))
            .with_workers(self.workers)
            .with_max_redirects(self.max_redirects);

        if let Some(depth) = self.max_depth {
            config = config.with_max_depth(depth);
        }
        if let Some(pages) = self.max_pages {
            config = config.with_max_pages(pages);
        }
        if let Some(secs) = self.max_time {
            config = config.with_max_time(Duration::from_secs(secs));
        }
        if let Some(agent) = &self.user_agent {
            config = config.with_user_agent(agent.clone());
        }

        Ok(config)
    }
}
