//! The crawl frontier
//!
//! This module handles:
//! - URL deduplication (every normalized URL is handed out at most once per job)
//! - Depth and page-budget limits
//! - Per-host micro-queues with politeness delays
//! - Quiescence detection: `take` reports exhaustion only when nothing is queued and no
//!   worker is still processing a page that could add more
//!
//! All bookkeeping sits behind one mutex that is held only for short, non-async sections.

use crate::state::HostState;
use crate::url::{dedup_key, host_key, normalize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::trace;
use url::Url;

/// A URL waiting to be processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Normalized URL
    pub url: Url,

    /// Link depth from the seed (seed = 0)
    pub depth: u32,

    /// Page the URL was discovered on
    pub parent: Option<Url>,
}

/// Outcome of [`Frontier::take`]
#[derive(Debug, PartialEq, Eq)]
pub enum Take {
    /// An entry claimed for processing; hand it back with [`Frontier::complete`]
    Ready(FrontierEntry),

    /// Nothing more will be handed out
    Exhausted,
}

#[derive(Debug)]
struct HostQueue {
    state: HostState,
    entries: VecDeque<FrontierEntry>,
}

#[derive(Debug, Default)]
struct FrontierInner {
    /// Dedup keys of every URL ever queued or visited
    seen: HashSet<String>,

    /// Dedup keys of URLs handed out or marked visited
    visited: HashSet<String>,

    hosts: HashMap<String, HostQueue>,

    /// Hosts with at least one queued entry, in round-robin order
    rotation: VecDeque<String>,

    queued: usize,

    in_flight: usize,

    /// Offers dropped for exceeding the depth limit
    depth_rejected: usize,
}

/// Shared frontier of one crawl job
pub struct Frontier {
    max_depth: u32,
    default_delay: Duration,
    budget: AtomicUsize,
    inner: Mutex<FrontierInner>,
    notify: Notify,
    stop: CancellationToken,
    /// Set once a `take` ran out of work, as opposed to being stopped
    drained: AtomicBool,
}

impl Frontier {
    /// Creates an empty frontier
    ///
    /// `default_delay` is the politeness delay of every host until robots.txt raises it;
    /// cancelling `stop` makes every later `take` return [`Take::Exhausted`].
    pub fn new(
        max_depth: u32,
        max_pages: usize,
        default_delay: Duration,
        stop: CancellationToken,
    ) -> Self {
        Self {
            max_depth,
            default_delay,
            budget: AtomicUsize::new(max_pages),
            inner: Mutex::new(FrontierInner::default()),
            notify: Notify::new(),
            stop,
            drained: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Offers a discovered URL
    ///
    /// Returns false (and changes nothing) if the job is stopping, `depth` exceeds the limit,
    /// the page budget is spent, or the normalized URL was already queued or visited.
    pub fn offer(&self, url: &Url, depth: u32, parent: Option<&Url>) -> bool {
        if self.stop.is_cancelled() {
            return false;
        }

        if depth > self.max_depth {
            self.lock().depth_rejected += 1;
            return false;
        }

        if self.remaining_budget() == 0 {
            return false;
        }

        let url = normalize(url);
        let Some(host) = host_key(&url) else {
            return false;
        };

        {
            let mut guard = self.lock();
            let inner = &mut *guard;
            if !inner.seen.insert(dedup_key(&url)) {
                return false;
            }

            let default_delay = self.default_delay;
            let queue = inner
                .hosts
                .entry(host.clone())
                .or_insert_with(|| HostQueue {
                    state: HostState::new(host.clone(), default_delay),
                    entries: VecDeque::new(),
                });
            let was_idle = queue.entries.is_empty();
            queue.entries.push_back(FrontierEntry {
                url,
                depth,
                parent: parent.cloned(),
            });
            if was_idle {
                inner.rotation.push_back(host);
            }
            inner.queued += 1;
        }

        self.notify.notify_waiters();
        true
    }

    /// Claims the next entry whose host is ready
    ///
    /// Suspends while entries are only deferred by politeness or while other workers are
    /// still processing pages. Every `Ready` entry must be passed to [`Frontier::complete`].
    pub async fn take(&self) -> Take {
        loop {
            // Registered before the state check so a concurrent offer/complete is not missed
            let notified = self.notify.notified();

            if self.stop.is_cancelled() {
                return Take::Exhausted;
            }

            let wait = match self.try_take(Instant::now()) {
                Poll::Ready(entry) => return Take::Ready(entry),
                Poll::Exhausted => {
                    self.drained.store(true, Ordering::SeqCst);
                    // Wake siblings so they observe exhaustion too
                    self.notify.notify_waiters();
                    return Take::Exhausted;
                }
                Poll::Wait(wait) => wait,
            };

            trace!("Frontier waiting (politeness delay {:?})", wait);

            tokio::select! {
                _ = notified => {}
                _ = tokio::time::sleep(wait.unwrap_or_default()), if wait.is_some() => {}
                _ = self.stop.cancelled() => return Take::Exhausted,
            }
        }
    }

    fn try_take(&self, now: Instant) -> Poll {
        let mut guard = self.lock();
        let inner = &mut *guard;

        if inner.queued == 0 {
            return if inner.in_flight == 0 {
                Poll::Exhausted
            } else {
                Poll::Wait(None)
            };
        }

        if self.remaining_budget() == 0 {
            return Poll::Exhausted;
        }

        let mut min_wait: Option<Duration> = None;

        for _ in 0..inner.rotation.len() {
            let Some(host) = inner.rotation.pop_front() else {
                break;
            };
            let Some(queue) = inner.hosts.get_mut(&host) else {
                continue;
            };

            // Drop entries that became visited while queued (redirect targets)
            while queue
                .entries
                .front()
                .is_some_and(|e| inner.visited.contains(&dedup_key(&e.url)))
            {
                queue.entries.pop_front();
                inner.queued -= 1;
            }
            if queue.entries.is_empty() {
                continue;
            }

            if let Some(wait) = queue.state.time_until_next_request(now) {
                min_wait = Some(min_wait.map_or(wait, |m| m.min(wait)));
                inner.rotation.push_back(host);
                continue;
            }

            if !self.claim_budget() {
                inner.rotation.push_front(host);
                return Poll::Exhausted;
            }

            let Some(entry) = queue.entries.pop_front() else {
                continue;
            };
            queue.state.record_fetch(now);
            let has_more = !queue.entries.is_empty();

            if has_more {
                inner.rotation.push_back(host);
            }
            inner.queued -= 1;
            inner.in_flight += 1;
            inner.visited.insert(dedup_key(&entry.url));

            return Poll::Ready(entry);
        }

        if inner.queued == 0 && inner.in_flight == 0 {
            return Poll::Exhausted;
        }

        Poll::Wait(min_wait)
    }

    /// Atomically decrements the budget if any is left
    fn claim_budget(&self) -> bool {
        self.budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |b| b.checked_sub(1))
            .is_ok()
    }

    /// Reports that processing of a taken entry finished
    ///
    /// Children of the entry must be offered before this is called.
    pub fn complete(&self, entry: &FrontierEntry) {
        {
            let mut inner = self.lock();
            inner.in_flight = inner.in_flight.saturating_sub(1);
        }
        trace!("Completed {}", entry.url);
        self.notify.notify_waiters();
    }

    /// Marks a URL as visited without processing it (e.g. a redirect target)
    ///
    /// A queued entry for the URL is dropped. Returns false if the URL was already visited.
    pub fn mark_visited(&self, url: &Url) -> bool {
        let key = dedup_key(url);
        let mut inner = self.lock();
        inner.seen.insert(key.clone());
        inner.visited.insert(key)
    }

    /// Raises a host's politeness delay (never below the job delay)
    pub fn update_host_delay(&self, host: &str, delay: Duration) {
        let default_delay = self.default_delay;
        let mut inner = self.lock();
        inner
            .hosts
            .entry(host.to_string())
            .or_insert_with(|| HostQueue {
                state: HostState::new(host, default_delay),
                entries: VecDeque::new(),
            })
            .state
            .raise_delay(delay);
    }

    /// Records links that were not offered because their depth would exceed the limit
    pub fn record_depth_cutoff(&self, count: usize) {
        if count > 0 {
            self.lock().depth_rejected += count;
        }
    }

    /// Pages that may still be dequeued
    pub fn remaining_budget(&self) -> usize {
        self.budget.load(Ordering::SeqCst)
    }

    /// Returns true if the frontier ran out of work (quiescence or budget) rather than
    /// being stopped
    pub fn is_drained(&self) -> bool {
        self.drained.load(Ordering::SeqCst)
    }

    pub fn depth_rejections(&self) -> usize {
        self.lock().depth_rejected
    }

    #[cfg(test)]
    fn is_visited(&self, url: &Url) -> bool {
        self.lock().visited.contains(&dedup_key(url))
    }

    /// Returns true if the URL is already queued or visited
    pub fn is_seen(&self, url: &Url) -> bool {
        self.lock().seen.contains(&dedup_key(url))
    }

    #[cfg(test)]
    fn queued_len(&self) -> usize {
        self.lock().queued
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }
}

enum Poll {
    Ready(FrontierEntry),
    Exhausted,
    /// Nothing ready; wait for a notification, or at most the given politeness delay
    Wait(Option<Duration>),
}
