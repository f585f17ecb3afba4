use crate::config::job::{
    CrawlJob, ScoringSettings, DEFAULT_DELAY, DEFAULT_FETCH_TIMEOUT, DEFAULT_JOB_TIMEOUT,
    DEFAULT_MAX_DEPTH, DEFAULT_MAX_PAGES, DEFAULT_ROBOTS_TTL, DEFAULT_WORKERS,
};
use serde::Deserialize;
use std::time::Duration;

/// Main configuration file structure for the Sift command line
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    pub scorer: Option<ScorerConfig>,
    pub images: Option<ImagesConfig>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Maximum depth to crawl from the seed URL
    pub max_depth: i32,

    /// Maximum number of pages processed per job
    pub max_pages: usize,

    /// Wall-clock limit for the whole job (seconds)
    pub timeout_secs: u64,

    /// Limit for a single fetch (seconds)
    pub fetch_timeout_secs: u64,

    /// Minimum time between requests to the same host (milliseconds)
    pub delay_ms: u64,

    /// Number of concurrent workers
    pub workers: usize,

    /// Render pages with the headless fetcher
    pub dynamic: bool,

    /// Lifetime of a cached robots.txt (seconds)
    pub robots_ttl_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_pages: DEFAULT_MAX_PAGES,
            timeout_secs: DEFAULT_JOB_TIMEOUT.as_secs(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT.as_secs(),
            delay_ms: DEFAULT_DELAY.as_millis() as u64,
            workers: DEFAULT_WORKERS,
            dynamic: false,
            robots_ttl_secs: DEFAULT_ROBOTS_TTL.as_secs(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: String,

    /// Email address for crawler-related contact
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "sift-crawler".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/sift-crawler".to_string(),
            contact_email: "crawler@example.com".to_string(),
        }
    }
}

/// Content and domain filters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FilterConfig {
    /// Case-insensitive keywords, any of which accepts a page
    pub keywords: Vec<String>,

    /// Host patterns discovered links must match
    pub allow_domains: Vec<String>,

    /// Host patterns discovered links must not match
    pub deny_domains: Vec<String>,
}

/// HTTP relevance scoring service
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScorerConfig {
    /// Endpoint receiving score requests
    pub endpoint: String,

    /// Description of what counts as relevant
    pub task: String,

    /// Candidate labels passed along with the task
    #[serde(default)]
    pub labels: Vec<String>,

    /// Minimum accepted score
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Limit for a single scorer call (milliseconds)
    #[serde(default = "default_scorer_timeout_ms")]
    pub timeout_ms: u64,
}

/// Image download configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ImagesConfig {
    /// Directory images are written to
    pub directory: String,
}

fn default_threshold() -> f64 {
    0.5
}

fn default_scorer_timeout_ms() -> u64 {
    5_000
}

/// Backend name the command line registers its HTTP scorer under
pub const HTTP_SCORER_BACKEND: &str = "http";

impl Config {
    /// Builds the crawl job this configuration describes for `seed_url`
    pub fn to_job(&self, seed_url: &str) -> CrawlJob {
        CrawlJob {
            max_depth: self.crawler.max_depth,
            max_pages: self.crawler.max_pages,
            timeout: Duration::from_secs(self.crawler.timeout_secs),
            fetch_timeout: Duration::from_secs(self.crawler.fetch_timeout_secs),
            delay: Duration::from_millis(self.crawler.delay_ms),
            workers: self.crawler.workers,
            use_dynamic_fetch: self.crawler.dynamic,
            download_images: self.images.is_some(),
            keywords: self.filter.keywords.clone(),
            scoring: self.scorer.as_ref().map(|scorer| ScoringSettings {
                backend: HTTP_SCORER_BACKEND.to_string(),
                task: scorer.task.clone(),
                labels: scorer.labels.clone(),
                threshold: scorer.threshold,
                timeout: Duration::from_millis(scorer.timeout_ms),
            }),
            allow_domains: self.filter.allow_domains.clone(),
            deny_domains: self.filter.deny_domains.clone(),
            user_agent: self.user_agent.header_value(),
            robots_ttl: Duration::from_secs(self.crawler.robots_ttl_secs),
            ..CrawlJob::new(seed_url)
        }
    }
}
