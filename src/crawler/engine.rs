//! The crawl engine - the caller-facing API
//!
//! A caller starts jobs with [`CrawlEngine::start_crawl`] and then polls
//! [`CrawlEngine::status`], listens on [`CrawlEngine::subscribe`], cancels, or collects
//! results once the job is terminal. Jobs run on the ambient tokio runtime.

use crate::config::{validate_job, CrawlJob};
use crate::crawler::coordinator::{Coordinator, JobRecord};
use crate::crawler::fetcher::{Fetcher, ModeFetcher};
use crate::crawler::frontier::Frontier;
use crate::crawler::images::ImageStore;
use crate::crawler::worker::CrawlContext;
use crate::filter::{RelevanceFilter, RelevanceScorer, ScorerBinding};
use crate::robots::RobotsGate;
use crate::state::{CrawlSummary, JobStatus, PageResult};
use crate::{ConfigError, SiftError};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Opaque reference to a started job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobHandle(Uuid);

impl JobHandle {
    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Runs crawl jobs against a fetcher and optional scorers and image store
///
/// # Example
///
/// ```no_run
/// use sift_crawler::{CrawlEngine, CrawlJob, HttpFetcher};
/// use std::sync::Arc;
///
/// # async fn run() -> sift_crawler::Result<()> {
/// let fetcher = HttpFetcher::with_user_agent("sift-crawler/0.1").unwrap();
/// let engine = CrawlEngine::new(Arc::new(fetcher));
///
/// let job = CrawlJob {
///     max_depth: 1,
///     keywords: vec!["robot".to_string()],
///     ..CrawlJob::new("https://example.com/")
/// };
/// let handle = engine.start_crawl(job)?;
/// let summary = engine.wait(handle).await?;
/// println!("{} pages fetched", summary.pages_fetched);
/// for page in engine.results(handle)? {
///     println!("{} {}", page.status, page.url);
/// }
/// # Ok(())
/// # }
/// ```
pub struct CrawlEngine {
    fetcher: Arc<dyn Fetcher>,
    dynamic_fetcher: Option<Arc<dyn Fetcher>>,
    scorers: HashMap<String, Arc<dyn RelevanceScorer>>,
    image_store: Option<Arc<dyn ImageStore>>,
    jobs: Mutex<HashMap<Uuid, Arc<JobRecord>>>,
}

impl CrawlEngine {
    /// Creates an engine fetching pages (and robots.txt and images) with `fetcher`
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            dynamic_fetcher: None,
            scorers: HashMap::new(),
            image_store: None,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Sets the headless backend used for jobs with `use_dynamic_fetch`
    pub fn with_dynamic_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.dynamic_fetcher = Some(fetcher);
        self
    }

    /// Registers a scorer backend under `name`, replacing any previous one
    pub fn with_scorer(mut self, name: impl Into<String>, scorer: Arc<dyn RelevanceScorer>) -> Self {
        self.scorers.insert(name.into(), scorer);
        self
    }

    /// Sets where images are stored for jobs with `download_images`
    pub fn with_image_store(mut self, store: Arc<dyn ImageStore>) -> Self {
        self.image_store = Some(store);
        self
    }

    fn jobs(&self) -> MutexGuard<'_, HashMap<Uuid, Arc<JobRecord>>> {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, handle: JobHandle) -> Result<Arc<JobRecord>, SiftError> {
        self.jobs()
            .get(&handle.0)
            .cloned()
            .ok_or(SiftError::UnknownJob(handle.0))
    }

    /// Validates and starts a job
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` (nothing is started) if the job is invalid, names an
    /// unregistered scorer backend, asks for image download without an image store, or reuses
    /// the id of a job this engine already knows.
    pub fn start_crawl(&self, job: CrawlJob) -> Result<JobHandle, ConfigError> {
        let seed = validate_job(&job)?;

        let binding = match &job.scoring {
            Some(settings) => {
                let scorer = self
                    .scorers
                    .get(&settings.backend)
                    .ok_or_else(|| ConfigError::UnknownScorer(settings.backend.clone()))?;
                Some(ScorerBinding::new(Arc::clone(scorer), settings))
            }
            None => None,
        };

        let images = if job.download_images {
            let store = self.image_store.as_ref().ok_or_else(|| {
                ConfigError::Validation(
                    "download_images requires an image store on the engine".to_string(),
                )
            })?;
            Some(Arc::clone(store))
        } else {
            None
        };

        let mut jobs = self.jobs();
        if jobs.contains_key(&job.id) {
            return Err(ConfigError::Validation(format!(
                "job id {} is already in use",
                job.id
            )));
        }

        let job = Arc::new(job);
        let cancel = CancellationToken::new();
        let stop = cancel.child_token();
        let record = Arc::new(JobRecord::new(job.id, cancel));

        let mode_fetcher = ModeFetcher::new(Arc::clone(&self.fetcher), self.dynamic_fetcher.clone());
        let static_fetcher = mode_fetcher.static_fetcher();
        let robots = RobotsGate::new(
            Arc::clone(&static_fetcher),
            job.user_agent.clone(),
            job.robots_ttl,
            job.fetch_timeout,
        );
        let frontier = Frontier::new(job.depth_limit(), job.max_pages, job.delay, stop.clone());
        let filter = RelevanceFilter::new(&job.keywords, binding);

        let ctx = Arc::new(CrawlContext::new(
            Arc::clone(&job),
            Arc::new(frontier),
            Arc::new(mode_fetcher),
            static_fetcher,
            Arc::new(robots),
            filter,
            images,
            stop,
            Arc::clone(&record.status),
        ));

        let coordinator = Coordinator::new(Arc::clone(&record), ctx, seed);
        jobs.insert(job.id, record);
        drop(jobs);

        tokio::spawn(coordinator.run());

        Ok(JobHandle(job.id))
    }

    /// Non-blocking snapshot of a job's state and progress
    pub fn status(&self, handle: JobHandle) -> Result<JobStatus, SiftError> {
        Ok(self.record(handle)?.current_status())
    }

    /// Subscribes to a job's status updates
    pub fn subscribe(&self, handle: JobHandle) -> Result<watch::Receiver<JobStatus>, SiftError> {
        Ok(self.record(handle)?.status.subscribe())
    }

    /// Requests cancellation; a no-op for jobs that already finished
    pub fn cancel(&self, handle: JobHandle) -> Result<(), SiftError> {
        let record = self.record(handle)?;
        if !record.current_status().state.is_terminal() {
            tracing::info!("Cancelling job {}", handle);
            record.cancel.cancel();
        }
        Ok(())
    }

    /// The job's results in completion order
    ///
    /// Only available once the job is terminal; repeated calls return the same sequence.
    pub fn results(&self, handle: JobHandle) -> Result<Vec<PageResult>, SiftError> {
        let record = self.record(handle)?;
        if record.summary().is_none() {
            return Err(SiftError::JobNotFinished(handle.0));
        }
        Ok(record.results())
    }

    /// The job's summary, once it is terminal
    pub fn summary(&self, handle: JobHandle) -> Result<CrawlSummary, SiftError> {
        self.record(handle)?
            .summary()
            .cloned()
            .ok_or(SiftError::JobNotFinished(handle.0))
    }

    /// Waits for the job to reach a terminal state and returns its summary
    pub async fn wait(&self, handle: JobHandle) -> Result<CrawlSummary, SiftError> {
        let record = self.record(handle)?;
        let mut rx = record.status.subscribe();
        // The sender lives in the record, so the channel cannot close while we hold it
        let _ = rx.wait_for(|status| status.state.is_terminal()).await;
        record
            .summary()
            .cloned()
            .ok_or(SiftError::JobNotFinished(handle.0))
    }

    /// Handles of every job this engine started
    pub fn jobs_started(&self) -> Vec<JobHandle> {
        self.jobs().keys().copied().map(JobHandle).collect()
    }
}
