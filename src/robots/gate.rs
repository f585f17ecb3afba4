//! Per-host robots.txt gate
//!
//! Each host gets its own async slot, so concurrent workers hitting a new host wait for a single
//! robots.txt fetch instead of issuing one each. Any failure to obtain rules is fail-open.

use crate::crawler::Fetcher;
use crate::robots::{CachedRobots, ParsedRobots};
use crate::url::host_key;
use crate::FetchError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

type HostSlot = Arc<tokio::sync::Mutex<Option<CachedRobots>>>;

/// Answers robots.txt questions for one crawl job
pub struct RobotsGate {
    fetcher: Arc<dyn Fetcher>,
    user_agent: String,
    ttl: Duration,
    fetch_timeout: Duration,
    hosts: Mutex<HashMap<String, HostSlot>>,
}

impl RobotsGate {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        user_agent: impl Into<String>,
        ttl: Duration,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            user_agent: user_agent.into(),
            ttl,
            fetch_timeout,
            hosts: Mutex::new(HashMap::new()),
        }
    }

    /// Checks whether `url` may be fetched
    ///
    /// Fetches robots.txt for the URL's host on first use and again once the cached copy is
    /// older than the TTL.
    pub async fn is_allowed(&self, url: &Url) -> bool {
        let Some(host) = host_key(url) else {
            return false;
        };

        let slot = self.slot(&host);
        let mut cached = slot.lock().await;

        let needs_fetch = cached.as_ref().map_or(true, CachedRobots::is_stale);
        if needs_fetch {
            let rules = self.fetch_rules(url).await;
            *cached = Some(CachedRobots::new(rules, self.ttl));
        }

        cached
            .as_ref()
            .map_or(true, |robots| robots.is_allowed(url.as_str(), &self.user_agent))
    }

    /// Crawl delay requested by `host`'s robots.txt, zero if none is known
    ///
    /// Only consults rules already fetched by [`RobotsGate::is_allowed`].
    pub async fn crawl_delay(&self, host: &str) -> Duration {
        let slot = {
            let hosts = self.hosts.lock().unwrap_or_else(|e| e.into_inner());
            hosts.get(host).cloned()
        };

        let Some(slot) = slot else {
            return Duration::ZERO;
        };

        let cached = slot.lock().await;
        cached
            .as_ref()
            .and_then(|robots| robots.crawl_delay(&self.user_agent))
            .unwrap_or(Duration::ZERO)
    }

    fn slot(&self, host: &str) -> HostSlot {
        let mut hosts = self.hosts.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(hosts.entry(host.to_string()).or_default())
    }

    async fn fetch_rules(&self, url: &Url) -> ParsedRobots {
        let robots_url = match url.join("/robots.txt") {
            Ok(u) => u,
            Err(e) => {
                warn!("Cannot build robots.txt URL for {}: {}", url, e);
                return ParsedRobots::allow_all();
            }
        };

        match self.fetcher.fetch(&robots_url, self.fetch_timeout, false).await {
            Ok(page) => {
                debug!("Fetched {}", robots_url);
                ParsedRobots::from_content(&page.text())
            }
            Err(FetchError::Status { status }) if (400..500).contains(&status) => {
                debug!("No robots.txt at {} (HTTP {})", robots_url, status);
                ParsedRobots::allow_all()
            }
            Err(e) => {
                warn!("Failed to fetch {}, allowing all: {}", robots_url, e);
                ParsedRobots::allow_all()
            }
        }
    }
}
