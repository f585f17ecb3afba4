use std::time::Duration;
use uuid::Uuid;

/// Default maximum link depth from the seed
pub const DEFAULT_MAX_DEPTH: i32 = 2;

/// Default page budget
pub const DEFAULT_MAX_PAGES: usize = 100;

/// Default wall-clock limit for a whole job
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(300);

/// Default limit for a single fetch
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default minimum spacing between two fetches to the same host
pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

/// Default worker pool size
pub const DEFAULT_WORKERS: usize = 4;

/// Default lifetime of a cached robots.txt
pub const DEFAULT_ROBOTS_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default user agent sent with every request
pub const DEFAULT_USER_AGENT: &str = concat!("sift-crawler/", env!("CARGO_PKG_VERSION"));

/// A fully-resolved crawl request
///
/// The engine never reads files or the environment: everything a job needs is carried here.
/// A job is immutable once started; the coordinator keeps it behind an `Arc` for its lifetime.
///
/// # Example
///
/// ```
/// use sift_crawler::CrawlJob;
///
/// let job = CrawlJob {
///     max_depth: 1,
///     max_pages: 10,
///     keywords: vec!["robot".to_string()],
///     ..CrawlJob::new("https://example.com/")
/// };
/// assert_eq!(job.depth_limit(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct CrawlJob {
    /// Job identifier, also used as the job handle
    pub id: Uuid,

    /// Where the crawl starts (depth 0)
    pub seed_url: String,

    /// Maximum link depth; negative values are rejected at start
    pub max_depth: i32,

    /// Maximum number of pages dequeued for processing; zero is rejected at start
    pub max_pages: usize,

    /// Wall-clock limit for the whole job
    pub timeout: Duration,

    /// Limit for a single fetch
    pub fetch_timeout: Duration,

    /// Minimum spacing between fetches to the same host
    pub delay: Duration,

    /// Number of concurrent workers
    pub workers: usize,

    /// Fetch pages through the headless (JavaScript-rendering) fetcher
    pub use_dynamic_fetch: bool,

    /// Download images of accepted pages into the engine's image store
    pub download_images: bool,

    /// Keywords for case-insensitive OR matching; empty disables keyword filtering
    pub keywords: Vec<String>,

    /// AI relevance scoring, if any
    pub scoring: Option<ScoringSettings>,

    /// Host patterns discovered links must match (empty = any host)
    pub allow_domains: Vec<String>,

    /// Host patterns discovered links must not match
    pub deny_domains: Vec<String>,

    /// User agent used for robots.txt group matching
    pub user_agent: String,

    /// How long a fetched robots.txt stays valid
    pub robots_ttl: Duration,
}

impl CrawlJob {
    /// Creates a job for `seed_url` with default limits and no filters
    pub fn new(seed_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            seed_url: seed_url.into(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_pages: DEFAULT_MAX_PAGES,
            timeout: DEFAULT_JOB_TIMEOUT,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            delay: DEFAULT_DELAY,
            workers: DEFAULT_WORKERS,
            use_dynamic_fetch: false,
            download_images: false,
            keywords: Vec::new(),
            scoring: None,
            allow_domains: Vec::new(),
            deny_domains: Vec::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            robots_ttl: DEFAULT_ROBOTS_TTL,
        }
    }

    /// The depth limit as an unsigned value (negative limits clamp to 0)
    pub fn depth_limit(&self) -> u32 {
        self.max_depth.max(0) as u32
    }

    /// Returns true if any relevance filtering is configured
    pub fn has_filters(&self) -> bool {
        !self.keywords.is_empty() || self.scoring.is_some()
    }
}

/// Configuration of the AI relevance scoring step
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringSettings {
    /// Name the scorer backend was registered under on the engine
    pub backend: String,

    /// Free-form description of what "relevant" means for this crawl
    pub task: String,

    /// Optional candidate labels for classification-style backends
    pub labels: Vec<String>,

    /// Pages scoring below this value are filtered out
    pub threshold: f64,

    /// Limit for a single scorer call
    pub timeout: Duration,
}

impl ScoringSettings {
    /// Creates settings for `backend` with a 0.5 threshold and a 5 second timeout
    pub fn new(backend: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            task: task.into(),
            labels: Vec::new(),
            threshold: 0.5,
            timeout: Duration::from_secs(5),
        }
    }
}
