//! Robots.txt cache entry with expiry

use crate::robots::ParsedRobots;
use chrono::{DateTime, Duration, Utc};

/// Cached robots.txt data for a host
///
/// Stores the parsed rules with the time they were fetched and the TTL they were fetched
/// under, so a lookup can tell whether the rules must be fetched again.
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// The parsed robots.txt content
    pub content: ParsedRobots,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,

    /// How long the entry stays fresh
    pub ttl: Duration,
}

impl CachedRobots {
    /// Creates a new cache entry stamped with the current time
    pub fn new(content: ParsedRobots, ttl: std::time::Duration) -> Self {
        Self {
            content,
            fetched_at: Utc::now(),
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::hours(24)),
        }
    }

    /// Checks if the entry has outlived its TTL
    pub fn is_stale(&self) -> bool {
        self.age() > self.ttl
    }

    /// Returns how long ago the robots.txt was fetched
    pub fn age(&self) -> Duration {
        Utc::now() - self.fetched_at
    }

    /// Checks if a URL is allowed according to the cached rules
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        self.content.is_allowed(url, user_agent)
    }

    /// Gets the crawl delay from the cached rules
    pub fn crawl_delay(&self, user_agent: &str) -> Option<std::time::Duration> {
        self.content.crawl_delay(user_agent)
    }
}
