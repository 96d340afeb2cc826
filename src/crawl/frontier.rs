// src/crawl/frontier.rs
// =============================================================================
// The crawl loop: a pool of workers draining a shared queue of tasks.
//
// How it works:
// 1. The seed URL is marked visited and queued
// 2. Each worker pops a task (breadth-first), fetches the target and
//    classifies the response
// 3. Broken target -> a BrokenLinkRecord for the edge that led there (and
//    for every other edge that was waiting on the same target)
// 4. Alive target whose final URL is in scope -> extract its anchors and
//    queue every edge whose target has never been seen
//    (with a depth limit, a page at the limit keeps its links on the side in
//    case a shorter path to it turns up later)
// 5. Repeat until the queue is empty AND no worker is busy (quiescence)
//
// Every task ends in exactly one of: reported, expanded, checked-only,
// or skipped. A stop signal (page budget, time budget, external
// cancellation) lets busy workers finish their current fetch and then keeps
// them from taking new work.
// =============================================================================

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Instant;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::edge::{is_http, resolve_edges, Edge};
use super::scope::ScopeRule;
use super::visited::{normalize, Claim, HeldPage, Landing, TargetOutcome, VisitedSet};
use crate::checker::{
    classify_status, BrokenStatus, FetchResult, Fetcher, HtmlLinkExtractor, HttpFetcher,
    LinkExtractor, LinkStatus,
};
use crate::config::CrawlConfig;
use crate::error::Result;
use crate::report::{BrokenLinkRecord, Reporter};

/// Why a crawl ended before reaching quiescence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MaxPages,
    MaxTime,
    Cancelled,
}

/// Counters for a finished crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    /// Fetches actually performed
    pub pages_fetched: usize,
    /// Pages whose links were extracted and followed
    pub pages_expanded: usize,
    /// Edges dropped without a fetch (seen before, not http, ...)
    pub edges_skipped: usize,
    /// Broken link records emitted
    pub broken_links: usize,
    /// Distinct URLs marked as visited
    pub urls_seen: usize,
    /// Tasks still queued when the crawl stopped
    pub abandoned: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
}

#[derive(Debug)]
enum Task {
    /// Fetch a target. `edge` is None only for the seed.
    Fetch { target: Url, edge: Option<Edge> },
    /// Follow the links of a page that was held at the depth limit and has
    /// since turned out to be closer to the seed.
    Follow(HeldPage),
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<Task>,
    in_flight: usize,
    finished: bool,
}

/// Drives a crawl from a seed to quiescence.
pub struct Crawler {
    config: CrawlConfig,
    scope: ScopeRule,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn LinkExtractor>,
    reporter: Arc<dyn Reporter>,
    cancel: CancellationToken,
}

impl Crawler {
    /// Validates the configuration and sets up the reqwest fetcher and the
    /// scraper-based extractor.
    pub fn new(config: CrawlConfig, reporter: Arc<dyn Reporter>) -> Result<Self> {
        let scope = config.validate()?;
        let fetcher = HttpFetcher::new(&config)?;

        Ok(Self {
            config,
            scope,
            fetcher: Arc::new(fetcher),
            extractor: Arc::new(HtmlLinkExtractor::new()),
            reporter,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn LinkExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Uses an externally owned token; cancelling it stops the crawl.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn scope(&self) -> &ScopeRule {
        &self.scope
    }

    /// Runs one crawl. Each call starts from an empty visited set.
    pub async fn run(&self) -> Result<CrawlSummary> {
        let seed = self.config.seed.clone();
        info!(
            %seed,
            authority = self.scope.authority(),
            prefixes = ?self.scope.prefixes(),
            workers = self.config.workers,
            "starting crawl"
        );
        if !self.scope.in_scope(&seed) {
            warn!(%seed, "seed is outside the crawl scope; only its status will be checked");
        }

        let shared = Arc::new(Shared {
            scope: self.scope.clone(),
            fetcher: self.fetcher.clone(),
            extractor: self.extractor.clone(),
            reporter: self.reporter.clone(),
            visited: VisitedSet::new(),
            queue: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            stop: self.cancel.child_token(),
            stop_reason: OnceLock::new(),
            max_depth: self.config.max_depth,
            max_pages: self.config.max_pages,
            dispatched: AtomicUsize::new(0),
            pages_fetched: AtomicUsize::new(0),
            pages_expanded: AtomicUsize::new(0),
            edges_skipped: AtomicUsize::new(0),
            broken_links: AtomicUsize::new(0),
        });

        shared.visited.try_mark(&seed);
        shared.lock_queue().pending.push_back(Task::Fetch {
            target: seed,
            edge: None,
        });

        let timer = self.config.max_time.map(|limit| {
            let shared = shared.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(limit) => shared.halt(StopReason::MaxTime),
                    _ = shared.stop.cancelled() => {}
                }
            })
        });

        let started = Instant::now();
        let workers: Vec<_> = (0..self.config.workers)
            .map(|id| {
                let shared = shared.clone();
                tokio::spawn(async move { shared.work(id).await })
            })
            .collect();

        let joined = join_all(workers).await;

        if let Some(timer) = timer {
            timer.abort();
            // Wait for the abort so the timer's handle on the shared state
            // (and the reporter inside it) is released before we return.
            let _ = timer.await;
        }
        for result in joined {
            result?;
        }

        let summary = shared.summary();
        info!(
            pages = summary.pages_fetched,
            broken = summary.broken_links,
            elapsed_ms = started.elapsed().as_millis() as u64,
            stop_reason = ?summary.stop_reason,
            "crawl finished"
        );
        Ok(summary)
    }
}

/// State shared by all workers of one run.
struct Shared {
    scope: ScopeRule,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn LinkExtractor>,
    reporter: Arc<dyn Reporter>,
    visited: VisitedSet,
    queue: Mutex<QueueState>,
    notify: Notify,
    stop: CancellationToken,
    stop_reason: OnceLock<StopReason>,
    max_depth: Option<usize>,
    max_pages: Option<usize>,
    dispatched: AtomicUsize,
    pages_fetched: AtomicUsize,
    pages_expanded: AtomicUsize,
    edges_skipped: AtomicUsize,
    broken_links: AtomicUsize,
}

// A claimed task. Dropping it, even while unwinding, queues the work it
// discovered and releases its in-flight slot.
struct InFlight<'a> {
    shared: &'a Shared,
    discovered: Vec<Task>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut queue = self.shared.lock_queue();
        queue.pending.extend(self.discovered.drain(..));
        queue.in_flight -= 1;
        drop(queue);
        self.shared.notify.notify_waiters();
    }
}

impl Shared {
    fn lock_queue(&self) -> MutexGuard<'_, QueueState> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn halt(&self, reason: StopReason) {
        if self.stop_reason.set(reason).is_ok() {
            info!(?reason, "stopping crawl");
        }
        self.stop.cancel();
        self.notify.notify_waiters();
    }

    async fn work(&self, id: usize) {
        debug!(worker = id, "worker started");
        while let Some(task) = self.next_task().await {
            let mut claim = InFlight {
                shared: self,
                discovered: Vec::new(),
            };
            claim.discovered = self.dispatch(task).await;
        }
        debug!(worker = id, "worker finished");
    }

    /// Waits for the next task. None means the crawl is over, either by
    /// quiescence or because it was stopped.
    async fn next_task(&self) -> Option<Task> {
        loop {
            let wakeup = {
                let mut queue = self.lock_queue();
                if queue.finished || self.stop.is_cancelled() {
                    return None;
                }
                if let Some(task) = queue.pending.pop_front() {
                    queue.in_flight += 1;
                    return Some(task);
                }
                if queue.in_flight == 0 {
                    queue.finished = true;
                    drop(queue);
                    self.notify.notify_waiters();
                    return None;
                }
                // Registered while the lock is held, so a notify_waiters()
                // issued after we release it cannot be missed.
                self.notify.notified()
            };

            tokio::select! {
                _ = wakeup => {}
                _ = self.stop.cancelled() => {}
            }
        }
    }

    /// Pending -> Dispatched -> one terminal state. Returns new tasks.
    async fn dispatch(&self, task: Task) -> Vec<Task> {
        let (target, edge) = match task {
            Task::Follow(held) => return self.follow(held),
            Task::Fetch { target, edge } => (target, edge),
        };

        if let Some(max_pages) = self.max_pages {
            if self.dispatched.fetch_add(1, Ordering::SeqCst) >= max_pages {
                debug!(url = %target, "page budget exhausted");
                self.halt(StopReason::MaxPages);
                // Put it back so it is counted as abandoned.
                self.lock_queue()
                    .pending
                    .push_front(Task::Fetch { target, edge });
                return Vec::new();
            }
        }

        let fetched = self.fetcher.fetch(&target).await;
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);

        match fetched {
            Err(e) => {
                debug!(url = %e.url, kind = %e.kind, "unreachable");
                self.settle(
                    &target,
                    edge.as_ref(),
                    TargetOutcome::Broken {
                        status: BrokenStatus::Unreachable(e.kind),
                        detail: Some(e.message),
                    },
                );
                Vec::new()
            }
            Ok(result) => match classify_status(result.status) {
                LinkStatus::Broken(status) => {
                    self.settle(
                        &target,
                        edge.as_ref(),
                        TargetOutcome::Broken {
                            status,
                            detail: None,
                        },
                    );
                    Vec::new()
                }
                LinkStatus::Ok(_) => {
                    self.settle(&target, edge.as_ref(), TargetOutcome::Alive);
                    self.expand(result)
                }
            },
        }
    }

    /// Records the outcome and reports every edge into a broken target.
    fn settle(&self, target: &Url, edge: Option<&Edge>, outcome: TargetOutcome) {
        let waiting = self.visited.resolve(target, outcome.clone());

        if let TargetOutcome::Broken { status, detail } = outcome {
            match edge {
                Some(edge) => self.report(edge, status, detail.clone()),
                None => self.report_seed(target, status, detail.clone()),
            }
            for edge in &waiting {
                self.report(edge, status, detail.clone());
            }
        }
    }

    fn expand(&self, result: FetchResult) -> Vec<Task> {
        let page = result.final_url.clone();

        if !self.scope.in_scope(&page) {
            debug!(url = %page, "out of scope, status checked only");
            return Vec::new();
        }
        if normalize(&page) != normalize(&result.url) {
            if let Landing::Seen(reopened) = self.visited.redirected(&result.url, &page) {
                debug!(from = %result.url, to = %page, "redirect target already visited");
                return reopened.into_iter().map(Task::Follow).collect();
            }
        }
        if !result.is_html() {
            debug!(url = %page, content_type = ?result.content_type, "not an HTML page");
            return Vec::new();
        }
        let Some(body) = result.body else {
            debug!(url = %page, status = result.status, "no body to extract links from");
            return Vec::new();
        };

        let edges = resolve_edges(&page, self.extractor.extract(&body));
        self.follow(HeldPage { page, edges })
    }

    /// Claims the targets of a page's links, unless the page sits at the
    /// depth limit, in which case the links are held on its visited entry.
    fn follow(&self, mut held: HeldPage) -> Vec<Task> {
        let depth = loop {
            let Some(depth) = self.visited.depth(&held.page) else {
                return Vec::new();
            };
            if !self.max_depth.is_some_and(|max| depth >= max) {
                break depth;
            }
            debug!(url = %held.page, depth, "depth limit reached");
            match self.visited.hold(held, depth) {
                None => return Vec::new(),
                Some(back) => held = back,
            }
        };

        let HeldPage { page, edges } = held;
        self.pages_expanded.fetch_add(1, Ordering::Relaxed);
        debug!(url = %page, depth, edges = edges.len(), "expanded");

        let mut discovered = Vec::new();
        let mut targets = Vec::new();
        for edge in edges {
            if !is_http(&edge.target) {
                debug!(href = %edge.anchor_href, "skipping non-http link");
                self.edges_skipped.fetch_add(1, Ordering::Relaxed);
                continue;
            }

            targets.push(normalize(&edge.target));
            match self.visited.claim(edge, depth + 1) {
                Claim::First(edge) => discovered.push(Task::Fetch {
                    target: edge.target.clone(),
                    edge: Some(edge),
                }),
                Claim::Waiting => {}
                Claim::Resolved {
                    outcome: TargetOutcome::Broken { status, detail },
                    edge,
                    ..
                } => self.report(&edge, status, detail),
                Claim::Resolved {
                    outcome: TargetOutcome::Alive,
                    reopened,
                    ..
                } => {
                    self.edges_skipped.fetch_add(1, Ordering::Relaxed);
                    discovered.extend(reopened.into_iter().map(Task::Follow));
                }
            }
        }

        let reopened = self.visited.followed(&page, targets, depth);
        discovered.extend(reopened.into_iter().map(Task::Follow));
        discovered
    }

    fn report(&self, edge: &Edge, status: BrokenStatus, detail: Option<String>) {
        warn!(
            url = %edge.target,
            %status,
            referrer = %edge.source_page,
            href = %edge.anchor_href,
            "broken link"
        );
        self.emit(BrokenLinkRecord {
            url: edge.target.to_string(),
            status,
            referrer_page: edge.source_page.to_string(),
            referrer_href: edge.anchor_href.clone(),
            referrer_text: edge.anchor_text.clone(),
            detail,
        });
    }

    fn report_seed(&self, seed: &Url, status: BrokenStatus, detail: Option<String>) {
        warn!(url = %seed, %status, "seed URL is broken");
        self.emit(BrokenLinkRecord {
            url: seed.to_string(),
            status,
            referrer_page: String::new(),
            referrer_href: seed.to_string(),
            referrer_text: String::new(),
            detail,
        });
    }

    fn emit(&self, record: BrokenLinkRecord) {
        self.broken_links.fetch_add(1, Ordering::Relaxed);
        self.reporter.report(record);
    }

    fn summary(&self) -> CrawlSummary {
        let (abandoned, quiescent) = {
            let queue = self.lock_queue();
            (queue.pending.len(), queue.finished)
        };
        // Anything that ended the run without reaching quiescence and did not
        // record its own reason came from the caller's token.
        let stop_reason = self
            .stop_reason
            .get()
            .copied()
            .or_else(|| (!quiescent).then_some(StopReason::Cancelled));

        CrawlSummary {
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            pages_expanded: self.pages_expanded.load(Ordering::Relaxed),
            edges_skipped: self.edges_skipped.load(Ordering::Relaxed),
            broken_links: self.broken_links.load(Ordering::Relaxed),
            urls_seen: self.visited.len(),
            abandoned,
            stop_reason,
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why a std Mutex in async code?
//    - The queue lock is only ever held for a few pointer moves
//    - It is never held across an .await, so it cannot stall the runtime
//    - tokio::sync::Mutex is only needed when a lock must survive an .await
//
// 2. What does Notify do?
//    - Idle workers park on notify.notified() instead of polling in a loop
//    - notify_waiters() wakes every parked worker after the queue changes
//    - The Notified future is created while the queue lock is held, so a
//      wakeup sent between "queue looked empty" and "start waiting" is kept
//
// 3. Why atomics for the counters?
//    - Many workers bump them at once; AtomicUsize needs no lock
//    - Relaxed ordering is enough for statistics read after all workers end
//
// 4. What is a CancellationToken?
//    - A cheap, cloneable "stop" flag from tokio-util
//    - child_token() gives each run its own token that is also cancelled
//      when the caller's token is
// -----------------------------------------------------------------------------
