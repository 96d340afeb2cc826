// src/main.rs
// =============================================================================
// This is the entry point of the link-sentry CLI.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (to stderr, so stdout stays clean for --json)
// 3. Run the crawl, streaming broken links to the requested outputs
// 4. Exit with proper code (0 = no broken links, 1 = broken links, 2 = error)
// =============================================================================

mod cli;

use std::fs::File;
use std::io::BufWriter;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, CrawlArgs};
use link_sentry::report::{spawn_writer, FanoutReporter, OutputFormat};
use link_sentry::{BrokenLinkRecord, ChannelReporter, CrawlSummary, Crawler, MemoryReporter};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// RUST_LOG wins; otherwise -v/-vv pick the level.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("link_sentry={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// Returns:
//   Ok(0) = no broken links
//   Ok(1) = broken links found
//   Err   = configuration or internal error (exit code 2)
async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Crawl(args) => handle_crawl(args).await,
    }
}

async fn handle_crawl(args: CrawlArgs) -> Result<i32> {
    let config = args.to_config()?;

    eprintln!("🔍 Crawling: {}", config.seed);
    if !config.prefixes.is_empty() {
        eprintln!("📂 Path prefixes: {}", config.prefixes.join(", "));
    }

    // Every record lands in memory for the final table and exit code, and
    // is streamed to --output / stdout as it is found.
    let memory = Arc::new(MemoryReporter::new());
    let mut reporter = FanoutReporter::new().with(memory.clone());
    let mut sinks = Vec::new();

    if let Some(path) = &args.output {
        let file = File::create(path)
            .with_context(|| format!("cannot create output file {}", path.display()))?;
        let (channel, rx) = ChannelReporter::channel();
        sinks.push(spawn_writer(rx, BufWriter::new(file), OutputFormat::JsonLines));
        reporter = reporter.with(Arc::new(channel));
    }
    if args.json {
        let (channel, rx) = ChannelReporter::channel();
        sinks.push(spawn_writer(rx, std::io::stdout(), OutputFormat::JsonLines));
        reporter = reporter.with(Arc::new(channel));
    }

    let crawler = Crawler::new(config, Arc::new(reporter)).context("failed to set up crawler")?;

    // Ctrl-C stops the crawl gracefully; everything found so far is kept.
    let token = crawler.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, finishing in-flight requests");
            token.cancel();
        }
    });

    let summary = crawler.run().await.context("crawl failed")?;

    // Dropping the crawler drops the channel senders, which lets the sinks
    // drain and finish.
    drop(crawler);
    for sink in sinks {
        sink.await.context("report writer failed")?;
    }

    let records = memory.sorted();
    if !args.json {
        print_table(&records);
    }
    print_summary(&summary);

    if records.is_empty() {
        Ok(0)
    } else {
        Ok(1)
    }
}

// Prints broken links as a human-readable table
fn print_table(records: &[BrokenLinkRecord]) {
    if records.is_empty() {
        println!("✅ No broken links found");
        return;
    }

    println!("{:<12} {:<60} {:<40}", "STATUS", "URL", "FOUND ON");
    println!("{}", "=".repeat(112));

    for record in records {
        let found_on = if record.referrer_page.is_empty() {
            "(seed)"
        } else {
            record.referrer_page.as_str()
        };
        println!(
            "{:<12} {:<60} {:<40}",
            format_status(record),
            truncate(&record.url, 60),
            truncate(found_on, 40)
        );
        if !record.referrer_text.is_empty() {
            println!("{:<12} ↳ \"{}\" ({})", "", record.referrer_text, record.referrer_href);
        }
    }

    println!();
}

fn print_summary(summary: &CrawlSummary) {
    eprintln!("📊 Summary:");
    eprintln!("   📄 Pages fetched: {}", summary.pages_fetched);
    eprintln!("   🔗 Pages expanded: {}", summary.pages_expanded);
    eprintln!("   ❌ Broken links: {}", summary.broken_links);
    if let Some(reason) = summary.stop_reason {
        eprintln!(
            "   ⏹️  Stopped early ({:?}), {} page(s) left unchecked",
            reason, summary.abandoned
        );
    }
}

fn format_status(record: &BrokenLinkRecord) -> String {
    if record.status.is_unreachable() {
        "⏱️  UNREACHABLE".to_string()
    } else {
        format!("❌ {}", record.status)
    }
}

// Truncates on a char boundary so multi-byte URLs never panic
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}
