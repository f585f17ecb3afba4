use std::time::{Duration, Instant};

/// Politeness state of one host during a crawl
///
/// Owned by the frontier and only touched under its lock. The robots decision cache for the
/// host lives in the `RobotsGate`; this structure only keeps what scheduling needs.
#[derive(Debug, Clone)]
pub struct HostState {
    /// Host key (lower-cased host plus non-default port)
    pub host: String,

    /// When the last entry for this host was dequeued
    pub last_fetch: Option<Instant>,

    /// Minimum spacing between two fetches to this host
    pub crawl_delay: Duration,
}

impl HostState {
    /// Creates a new HostState that has never been fetched
    pub fn new(host: impl Into<String>, crawl_delay: Duration) -> Self {
        Self {
            host: host.into(),
            last_fetch: None,
            crawl_delay,
        }
    }

    /// Records that a request was made to this host
    pub fn record_fetch(&mut self, now: Instant) {
        self.last_fetch = Some(now);
    }

    /// Raises the crawl delay to `delay` if it is longer than the current one
    ///
    /// A robots.txt Crawl-delay never shortens the job's own delay.
    pub fn raise_delay(&mut self, delay: Duration) {
        if delay > self.crawl_delay {
            self.crawl_delay = delay;
        }
    }

    /// Calculates the time until the next request can be made
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    pub fn time_until_next_request(&self, now: Instant) -> Option<Duration> {
        let last = self.last_fetch?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < self.crawl_delay {
            Some(self.crawl_delay - elapsed)
        } else {
            None
        }
    }
}
