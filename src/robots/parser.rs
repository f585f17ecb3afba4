//! Robots.txt parser implementation
//!
//! Allow/Disallow matching is delegated to the robotstxt crate; Crawl-delay is parsed here
//! because that crate does not expose it.

use robotstxt::DefaultMatcher;
use std::time::Duration;

/// Longest Crawl-delay honoured; larger values are capped to this
pub const MAX_CRAWL_DELAY: Duration = Duration::from_secs(60);

/// Parsed robots.txt data for one host
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRobots {
    /// Raw robots.txt content
    content: String,
    /// Set when robots.txt was missing or unreadable (fail-open)
    allow_all: bool,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            allow_all: false,
        }
    }

    /// Creates a permissive ParsedRobots that allows everything with no crawl delay
    ///
    /// This is the fail-open value used when robots.txt cannot be fetched.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            allow_all: true,
        }
    }

    /// Checks if a URL is allowed for the given user agent
    ///
    /// `url` may be a full URL or an absolute path; only its path, params and query are matched.
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.allow_all || self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, &agent_token(user_agent), url)
    }

    /// Gets the crawl delay that applies to a user agent
    ///
    /// A group naming the agent wins over the `*` group. Values that are not a valid duration
    /// are ignored and valid ones are capped at [`MAX_CRAWL_DELAY`].
    pub fn crawl_delay(&self, user_agent: &str) -> Option<Duration> {
        if self.allow_all {
            return None;
        }

        let agent = agent_token(user_agent).to_lowercase();
        let mut group_agents: Vec<String> = Vec::new();
        let mut group_has_rules = false;
        let mut wildcard_delay: Option<Duration> = None;
        let mut agent_delay: Option<Duration> = None;

        for line in self.content.lines() {
            // Strip trailing comments
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    // A user-agent line after rules opens a new group
                    if group_has_rules {
                        group_agents.clear();
                        group_has_rules = false;
                    }
                    group_agents.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    group_has_rules = true;
                    // Negative, NaN and overflowing values have no Duration
                    let Some(delay) = value
                        .parse::<f64>()
                        .ok()
                        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                    else {
                        continue;
                    };
                    if group_agents.iter().any(|ua| !agent.is_empty() && *ua == agent) {
                        agent_delay = Some(delay);
                    } else if group_agents.iter().any(|ua| ua == "*") {
                        wildcard_delay = Some(delay);
                    }
                }
                _ => group_has_rules = true,
            }
        }

        agent_delay
            .or(wildcard_delay)
            .map(|delay| delay.min(MAX_CRAWL_DELAY))
    }
}

/// Extracts the product token robots.txt groups are matched against
///
/// `sift-crawler/0.1 (+https://example.com)` becomes `sift-crawler`.
pub fn agent_token(user_agent: &str) -> String {
    user_agent
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}
