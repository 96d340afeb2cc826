// src/crawl/visited.rs
// =============================================================================
// The set of URLs that have already been handed to the fetcher.
//
// This is the crawler's only deduplication mechanism. Without it a page A
// linking to B linking back to A would be crawled forever.
//
// Rules:
// - URLs are keyed after normalization: the #fragment is dropped, the
//   ?query is kept (different queries are different pages)
// - a key is marked exactly once, even when many workers race on the same
//   URL; only the winner may fetch it
//
// Besides "seen or not", each entry remembers how its fetch turned out. A
// broken page is reported once per referring edge, so an edge that arrives
// after the target was fetched still needs that answer; one that arrives
// while the fetch is running waits on the entry until resolve() is called.
//
// Each entry also keeps the shortest known distance from the seed. Workers
// race, so a long path can reach a page before a short one does. When a
// shorter path shows up later the new depth flows down through the links
// already followed from that page, and pages that were held back at the
// depth limit are handed out again (without a second fetch).
// =============================================================================

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use url::Url;

use super::Edge;
use crate::checker::BrokenStatus;

/// How the fetch of a target ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
    Alive,
    Broken {
        status: BrokenStatus,
        detail: Option<String>,
    },
}

/// A fetched page whose links were not followed because it sat at the depth
/// limit.
#[derive(Debug, Clone)]
pub struct HeldPage {
    /// The page the links were found on (after redirects)
    pub page: Url,
    pub edges: Vec<Edge>,
}

/// Answer to [`VisitedSet::claim`].
#[derive(Debug)]
pub enum Claim {
    /// First time this URL is seen: the caller must schedule the fetch
    First(Edge),
    /// Already being fetched; the edge was parked on the entry
    Waiting,
    /// Already fetched; here is how it went, plus any held pages the edge
    /// brought within reach
    Resolved {
        outcome: TargetOutcome,
        edge: Edge,
        reopened: Vec<HeldPage>,
    },
}

/// Answer to [`VisitedSet::redirected`].
#[derive(Debug)]
pub enum Landing {
    /// Nobody had marked the final URL; the caller follows its links
    New,
    /// The final URL was already known
    Seen(Vec<HeldPage>),
}

#[derive(Debug)]
enum Fetch {
    InFlight(Vec<Edge>),
    Resolved(TargetOutcome),
}

#[derive(Debug)]
enum Links {
    /// Not followed (yet, or ever)
    Unknown,
    Held(HeldPage),
    /// Normalized targets of the links that were followed
    Followed(Vec<String>),
    /// The fetch ended on another page, which owns the links
    Redirected(String),
}

#[derive(Debug)]
struct Visit {
    depth: usize,
    fetch: Fetch,
    links: Links,
}

impl Visit {
    fn new(depth: usize, fetch: Fetch) -> Self {
        Self {
            depth,
            fetch,
            links: Links::Unknown,
        }
    }
}

/// Cloning gives another handle to the same underlying set.
#[derive(Debug, Clone, Default)]
pub struct VisitedSet {
    inner: Arc<Mutex<HashMap<String, Visit>>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    // Critical sections never panic halfway through an update, so a poisoned
    // lock still guards consistent data.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Visit>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks the URL as a crawl root (depth 0). Returns true only for the
    /// first caller.
    pub fn try_mark(&self, url: &Url) -> bool {
        match self.lock().entry(normalize(url)) {
            Entry::Vacant(slot) => {
                slot.insert(Visit::new(0, Fetch::InFlight(Vec::new())));
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Marks the edge's target at `depth`, or tells the caller what is
    /// already known about it.
    pub fn claim(&self, edge: Edge, depth: usize) -> Claim {
        let key = normalize(&edge.target);
        let mut map = self.lock();

        let outcome = match map.get_mut(&key) {
            None => {
                map.insert(key, Visit::new(depth, Fetch::InFlight(Vec::new())));
                return Claim::First(edge);
            }
            Some(visit) => match &mut visit.fetch {
                Fetch::InFlight(waiting) => {
                    waiting.push(edge);
                    // Links are only ever recorded after the fetch resolved,
                    // so lowering the depth is all there is to do.
                    visit.depth = visit.depth.min(depth);
                    return Claim::Waiting;
                }
                Fetch::Resolved(outcome) => outcome.clone(),
            },
        };

        Claim::Resolved {
            outcome,
            edge,
            reopened: relax(&mut map, key, depth),
        }
    }

    /// Records the outcome of a fetch and hands back the edges that were
    /// waiting on it.
    pub fn resolve(&self, url: &Url, outcome: TargetOutcome) -> Vec<Edge> {
        let mut map = self.lock();
        match map.entry(normalize(url)) {
            Entry::Occupied(mut slot) => {
                match mem::replace(&mut slot.get_mut().fetch, Fetch::Resolved(outcome)) {
                    Fetch::InFlight(waiting) => waiting,
                    Fetch::Resolved(_) => Vec::new(),
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(Visit::new(0, Fetch::Resolved(outcome)));
                Vec::new()
            }
        }
    }

    /// Records that fetching `from` ended on the live page `to`. The final
    /// page inherits the depth of `from`.
    pub fn redirected(&self, from: &Url, to: &Url) -> Landing {
        let from_key = normalize(from);
        let to_key = normalize(to);
        let mut map = self.lock();

        let depth = map.get(&from_key).map_or(0, |visit| visit.depth);
        if let Some(visit) = map.get_mut(&from_key) {
            visit.links = Links::Redirected(to_key.clone());
        }

        if map.contains_key(&to_key) {
            return Landing::Seen(relax(&mut map, to_key, depth));
        }
        map.insert(to_key, Visit::new(depth, Fetch::Resolved(TargetOutcome::Alive)));
        Landing::New
    }

    /// Shortest known distance from the seed.
    pub fn depth(&self, url: &Url) -> Option<usize> {
        self.lock().get(&normalize(url)).map(|visit| visit.depth)
    }

    /// Parks a page that is too deep to follow at `depth`. If a shorter path
    /// was found in the meantime, the page is handed back instead.
    pub fn hold(&self, held: HeldPage, depth: usize) -> Option<HeldPage> {
        let mut map = self.lock();
        match map.get_mut(&normalize(&held.page)) {
            Some(visit) if visit.depth < depth => Some(held),
            Some(visit) => {
                visit.links = Links::Held(held);
                None
            }
            None => None,
        }
    }

    /// Records the links followed from `page` at `depth`. If the page got
    /// closer to the seed while they were being claimed, the shorter depth is
    /// passed on to them.
    pub fn followed(&self, page: &Url, mut targets: Vec<String>, depth: usize) -> Vec<HeldPage> {
        targets.sort();
        targets.dedup();

        let mut map = self.lock();
        let Some(visit) = map.get_mut(&normalize(page)) else {
            return Vec::new();
        };
        let current = visit.depth;
        visit.links = Links::Followed(targets.clone());

        if current >= depth {
            return Vec::new();
        }
        targets
            .into_iter()
            .flat_map(|target| relax(&mut map, target, current + 1))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }
}

// Lowers the depth of `key` to `depth`, then of everything reachable through
// links already followed from it. Returns the held pages that came back
// within reach.
fn relax(map: &mut HashMap<String, Visit>, key: String, depth: usize) -> Vec<HeldPage> {
    let mut reopened = Vec::new();
    let mut pending = vec![(key, depth)];

    while let Some((key, depth)) = pending.pop() {
        let Some(visit) = map.get_mut(&key) else {
            continue;
        };
        if visit.depth <= depth {
            continue;
        }
        visit.depth = depth;

        match mem::replace(&mut visit.links, Links::Unknown) {
            Links::Unknown => {}
            Links::Held(page) => reopened.push(page),
            Links::Followed(targets) => {
                pending.extend(targets.iter().map(|t| (t.clone(), depth + 1)));
                visit.links = Links::Followed(targets);
            }
            Links::Redirected(target) => {
                pending.push((target.clone(), depth));
                visit.links = Links::Redirected(target);
            }
        }
    }
    reopened
}

/// Normalized key for a URL: identical to the URL minus its fragment.
pub fn normalize(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}
