//! Worker pool - per-page processing
//!
//! Each worker loops: take an entry from the frontier → check robots.txt → fetch with timeout
//! → extract → filter → (if accepted) download images and offer discovered links → record the
//! result → hand the entry back to the frontier.
//!
//! A page that panics is recorded as failed; the worker and its siblings keep going.

use crate::config::CrawlJob;
use crate::crawler::extractor::extract;
use crate::crawler::fetcher::{FetchedPage, Fetcher};
use crate::crawler::frontier::{Frontier, FrontierEntry, Take};
use crate::crawler::images::{download_images, ImageStore};
use crate::crawler::sink::ResultSink;
use crate::filter::{RelevanceBasis, RelevanceFilter, ScoreRequest};
use crate::robots::RobotsGate;
use crate::state::{JobStatus, PageResult, PageStatus};
use crate::url::{dedup_key, host_key, DomainPolicy};
use crate::FetchError;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Everything the workers of one job share
pub struct CrawlContext {
    pub job: Arc<CrawlJob>,
    pub frontier: Arc<Frontier>,
    pub sink: Arc<ResultSink>,
    /// Page fetcher (routes dynamic requests)
    pub fetcher: Arc<dyn Fetcher>,
    /// Fetcher for images
    pub static_fetcher: Arc<dyn Fetcher>,
    pub robots: Arc<RobotsGate>,
    pub filter: RelevanceFilter,
    pub domains: DomainPolicy,
    pub images: Option<Arc<dyn ImageStore>>,
    /// Job-wide stop signal (external cancel or timeout)
    pub stop: CancellationToken,
    pub progress: Arc<watch::Sender<JobStatus>>,
    robots_denied: AtomicUsize,
}

impl CrawlContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        job: Arc<CrawlJob>,
        frontier: Arc<Frontier>,
        fetcher: Arc<dyn Fetcher>,
        static_fetcher: Arc<dyn Fetcher>,
        robots: Arc<RobotsGate>,
        filter: RelevanceFilter,
        images: Option<Arc<dyn ImageStore>>,
        stop: CancellationToken,
        progress: Arc<watch::Sender<JobStatus>>,
    ) -> Self {
        let domains = DomainPolicy::new(job.allow_domains.clone(), job.deny_domains.clone());
        Self {
            job,
            frontier,
            sink: Arc::new(ResultSink::new()),
            fetcher,
            static_fetcher,
            robots,
            filter,
            domains,
            images,
            stop,
            progress,
            robots_denied: AtomicUsize::new(0),
        }
    }

    /// Discovered links dropped because robots.txt disallowed them
    pub fn robots_denied(&self) -> usize {
        self.robots_denied.load(Ordering::SeqCst)
    }

    fn record(&self, result: PageResult) {
        let accepted = self.sink.push(result);
        self.progress.send_modify(|status| status.pages_fetched = accepted);
    }
}

/// Fixed-size pool of workers sharing one frontier
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Runs workers until the frontier is exhausted
    pub async fn run(&self, ctx: Arc<CrawlContext>) {
        let mut set = JoinSet::new();
        for id in 0..self.workers {
            set.spawn(worker_loop(id, Arc::clone(&ctx)));
        }

        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker task ended abnormally: {}", e);
            }
        }
    }
}

async fn worker_loop(id: usize, ctx: Arc<CrawlContext>) {
    tracing::debug!("Worker {} started", id);
    let mut processed = 0usize;

    while let Take::Ready(entry) = ctx.frontier.take().await {
        let result = match AssertUnwindSafe(process_page(&ctx, &entry))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!("Worker {} panicked on {}: {}", id, entry.url, message);
                PageResult::failed(
                    &entry.url,
                    entry.depth,
                    entry.parent.as_ref(),
                    format!("page processing panicked: {}", message),
                )
            }
        };

        ctx.record(result);
        ctx.frontier.complete(&entry);
        processed += 1;
    }

    tracing::debug!("Worker {} finished after {} pages", id, processed);
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Processes one dequeued entry into its result
async fn process_page(ctx: &CrawlContext, entry: &FrontierEntry) -> PageResult {
    let url = &entry.url;
    let parent = entry.parent.as_ref();
    tracing::debug!("Processing {} (depth {})", url, entry.depth);

    if !ctx.robots.is_allowed(url).await {
        tracing::info!("URL {} disallowed by robots.txt", url);
        let mut result = PageResult::new(url, entry.depth, parent, PageStatus::FilteredOut);
        result.basis = Some(RelevanceBasis::RobotsDenied);
        return result;
    }

    let started = Instant::now();
    let fetched = fetch_page(ctx, url).await;
    let fetch_duration = started.elapsed();

    let page = match fetched {
        Ok(page) => page,
        Err(e) => {
            tracing::debug!("Fetch of {} failed: {}", url, e);
            let mut result = PageResult::failed(url, entry.depth, parent, &e);
            result.fetch_duration = fetch_duration;
            return result;
        }
    };

    if !page.is_html() {
        let content_type = page.content_type.clone().unwrap_or_default();
        let mut result = PageResult::failed(
            url,
            entry.depth,
            parent,
            FetchError::ContentMismatch(content_type),
        );
        result.fetch_duration = fetch_duration;
        return result;
    }

    let mut result = PageResult::new(url, entry.depth, parent, PageStatus::Fetched);
    result.fetch_duration = fetch_duration;

    if dedup_key(&page.final_url) != dedup_key(url) {
        result.final_url = Some(page.final_url.to_string());
        if !ctx.frontier.mark_visited(&page.final_url) {
            tracing::debug!("{} redirected to already visited {}", url, page.final_url);
            result.status = PageStatus::FilteredOut;
            result.basis = Some(RelevanceBasis::DuplicateTarget);
            return result;
        }
    }

    let extracted = extract(&page.text(), &page.final_url);

    let verdict = ctx
        .filter
        .accept(&ScoreRequest {
            text: extracted.text.clone(),
            title: extracted.title.clone(),
            image: extracted.representative_image().map(|i| i.url.clone()),
        })
        .await;

    result.title = extracted.title;
    result.text = extracted.text;
    result.links = extracted.links.iter().map(Url::to_string).collect();
    result.images = extracted.images;
    result.metadata = extracted.metadata;
    result.score = verdict.score;
    result.basis = Some(verdict.basis);

    if !verdict.accepted {
        tracing::debug!("Filtered out {}", url);
        result.status = PageStatus::FilteredOut;
        return result;
    }

    // In-flight pages still finish after a stop, without images or links
    if ctx.stop.is_cancelled() {
        tracing::debug!("Job stopping; finishing {} without images or links", url);
        return result;
    }

    if ctx.job.download_images && !result.images.is_empty() {
        if let Some(store) = &ctx.images {
            download_images(
                ctx.static_fetcher.as_ref(),
                store.as_ref(),
                &mut result.images,
                ctx.job.fetch_timeout,
            )
            .await;
        }
    }

    offer_links(ctx, entry, &extracted.links).await;

    result
}

/// Fetches a page, bounding the call by the job's fetch timeout
async fn fetch_page(ctx: &CrawlContext, url: &Url) -> Result<FetchedPage, FetchError> {
    let timeout = ctx.job.fetch_timeout;
    match tokio::time::timeout(
        timeout,
        ctx.fetcher.fetch(url, timeout, ctx.job.use_dynamic_fetch),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(timeout)),
    }
}

/// Offers the links of an accepted page to the frontier
async fn offer_links(ctx: &CrawlContext, entry: &FrontierEntry, links: &[Url]) {
    if links.is_empty() || ctx.stop.is_cancelled() {
        return;
    }

    let child_depth = entry.depth + 1;
    if child_depth > ctx.frontier.max_depth() {
        ctx.frontier.record_depth_cutoff(links.len());
        return;
    }

    let mut offered = 0usize;
    for link in links {
        if ctx.stop.is_cancelled() || ctx.frontier.remaining_budget() == 0 {
            break;
        }
        if ctx.frontier.is_seen(link) || !ctx.domains.permits(link) {
            continue;
        }
        if !ctx.robots.is_allowed(link).await {
            tracing::debug!("Not offering {}: disallowed by robots.txt", link);
            ctx.robots_denied.fetch_add(1, Ordering::SeqCst);
            continue;
        }
        if let Some(host) = host_key(link) {
            let delay = ctx.robots.crawl_delay(&host).await;
            if delay > Duration::ZERO {
                ctx.frontier.update_host_delay(&host, delay);
            }
        }
        if ctx.frontier.offer(link, child_depth, Some(&entry.url)) {
            offered += 1;
        }
    }

    tracing::debug!("Offered {} of {} links from {}", offered, links.len(), entry.url);
}
