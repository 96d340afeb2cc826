// src/report/mod.rs
// =============================================================================
// Broken link records and the places they go.
//
// The crawler hands every broken edge to a Reporter. Reporters must never
// block the crawl and must never fail it: a record that cannot be delivered
// is logged and dropped.
//
// Implementations:
// - ChannelReporter: pushes into an unbounded tokio channel; a consumer task
//   on the other end does the actual writing (see sink.rs)
// - MemoryReporter: keeps everything in memory (CLI summary, tests)
// - FanoutReporter: forwards each record to several reporters
// =============================================================================

mod sink;

pub use sink::{spawn_writer, OutputFormat};

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::warn;

use crate::checker::BrokenStatus;

/// One broken edge: the dead target plus the anchor that pointed at it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokenLinkRecord {
    /// The broken target (absolute)
    pub url: String,
    /// Status code, or "unreachable"
    pub status: BrokenStatus,
    /// Page containing the anchor; empty for the seed itself
    pub referrer_page: String,
    /// The href exactly as written on the referring page
    pub referrer_href: String,
    pub referrer_text: String,
    /// Transport error details, when there was no response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl BrokenLinkRecord {
    /// Ordering key used wherever output has to be deterministic.
    pub fn sort_key(&self) -> (&str, &str) {
        (&self.referrer_page, &self.referrer_href)
    }
}

/// Receives broken link records as the crawl finds them.
pub trait Reporter: Send + Sync {
    fn report(&self, record: BrokenLinkRecord);
}

/// Sends records down an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: UnboundedSender<BrokenLinkRecord>,
}

impl ChannelReporter {
    pub fn new(tx: UnboundedSender<BrokenLinkRecord>) -> Self {
        Self { tx }
    }

    /// A reporter plus the receiving end of its channel.
    pub fn channel() -> (Self, UnboundedReceiver<BrokenLinkRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl Reporter for ChannelReporter {
    fn report(&self, record: BrokenLinkRecord) {
        if let Err(e) = self.tx.send(record) {
            warn!(url = %e.0.url, "report sink is gone, dropping broken link record");
        }
    }
}

/// Collects records in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryReporter {
    records: Arc<Mutex<Vec<BrokenLinkRecord>>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records in arrival order.
    pub fn records(&self) -> Vec<BrokenLinkRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Records sorted by (referrer page, referrer href).
    pub fn sorted(&self) -> Vec<BrokenLinkRecord> {
        let mut records = self.records();
        sort_records(&mut records);
        records
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, record: BrokenLinkRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}

/// Forwards every record to each inner reporter.
#[derive(Clone, Default)]
pub struct FanoutReporter {
    reporters: Vec<Arc<dyn Reporter>>,
}

impl FanoutReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporters.push(reporter);
        self
    }
}

impl Reporter for FanoutReporter {
    fn report(&self, record: BrokenLinkRecord) {
        for reporter in &self.reporters {
            reporter.report(record.clone());
        }
    }
}

/// Sorts records by (referrer page, referrer href, url).
pub fn sort_records(records: &mut [BrokenLinkRecord]) {
    records.sort_by(|a, b| {
        a.sort_key()
            .cmp(&b.sort_key())
            .then_with(|| a.url.cmp(&b.url))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::TransportErrorKind;

    fn record(page: &str, href: &str) -> BrokenLinkRecord {
        BrokenLinkRecord {
            url: format!("http://x.test{}", href),
            status: BrokenStatus::NotFound,
            referrer_page: page.to_string(),
            referrer_href: href.to_string(),
            referrer_text: String::new(),
            detail: None,
        }
    }

    #[test]
    fn test_record_json_shape() {
        let record = BrokenLinkRecord {
            url: "http://x.test/missing".to_string(),
            status: BrokenStatus::NotFound,
            referrer_page: "http://x.test/".to_string(),
            referrer_href: "/missing".to_string(),
            referrer_text: "M".to_string(),
            detail: None,
        };

        let json: serde_json::Value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "url": "http://x.test/missing",
                "status": 404,
                "referrerPage": "http://x.test/",
                "referrerHref": "/missing",
                "referrerText": "M"
            })
        );
    }

    #[test]
    fn test_unreachable_record_json() {
        let record = BrokenLinkRecord {
            status: BrokenStatus::Unreachable(TransportErrorKind::Timeout),
            detail: Some("request timed out".to_string()),
            ..record("http://x.test/", "/slow")
        };

        let json: serde_json::Value = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "unreachable");
        assert_eq!(json["detail"], "request timed out");
    }

    #[test]
    fn test_memory_reporter_sorts() {
        let reporter = MemoryReporter::new();
        reporter.report(record("http://x.test/b", "/z"));
        reporter.report(record("http://x.test/a", "/y"));
        reporter.report(record("http://x.test/a", "/x"));

        let sorted: Vec<_> = reporter
            .sorted()
            .into_iter()
            .map(|r| (r.referrer_page, r.referrer_href))
            .collect();

        assert_eq!(
            sorted,
            vec![
                ("http://x.test/a".to_string(), "/x".to_string()),
                ("http://x.test/a".to_string(), "/y".to_string()),
                ("http://x.test/b".to_string(), "/z".to_string()),
            ]
        );
        assert_eq!(reporter.len(), 3);
    }

    #[test]
    fn test_channel_reporter_survives_closed_receiver() {
        let (reporter, rx) = ChannelReporter::channel();
        drop(rx);
        // Must not panic.
        reporter.report(record("http://x.test/", "/gone"));
    }

    #[tokio::test]
    async fn test_channel_reporter_delivers() {
        let (reporter, mut rx) = ChannelReporter::channel();
        reporter.report(record("http://x.test/", "/a"));
        drop(reporter);

        assert_eq!(rx.recv().await.unwrap().referrer_href, "/a");
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_fanout_reaches_every_reporter() {
        let first = Arc::new(MemoryReporter::new());
        let second = Arc::new(MemoryReporter::new());
        let fanout = FanoutReporter::new()
            .with(first.clone())
            .with(second.clone());

        fanout.report(record("http://x.test/", "/a"));

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
    }
}
