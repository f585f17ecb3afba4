//! Crawler coordinator - drives one job through its lifecycle
//!
//! `Pending → Running` when the seed is offered and the worker pool starts.
//! The job then ends in exactly one of:
//! - `Completed`: the frontier reached quiescence or the page budget was spent
//! - `Failed(timeout)`: the job timeout elapsed; no new entries are dequeued and in-flight
//!   pages finish and keep their results
//! - `Cancelled`: the external cancel token fired; same drain behavior as a timeout

use crate::crawler::worker::{CrawlContext, WorkerPool};
use crate::state::{CrawlSummary, JobState, JobStatus, PageResult, TerminalReason};
use chrono::Utc;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

/// Shared record of a started job, read by the engine's query methods
pub struct JobRecord {
    pub id: Uuid,
    /// External cancellation; the job's stop token is a child of it
    pub cancel: CancellationToken,
    pub status: Arc<watch::Sender<JobStatus>>,
    ctx: OnceLock<Arc<CrawlContext>>,
    summary: OnceLock<CrawlSummary>,
}

impl JobRecord {
    pub fn new(id: Uuid, cancel: CancellationToken) -> Self {
        let (status, _) = watch::channel(JobStatus::pending());
        Self {
            id,
            cancel,
            status: Arc::new(status),
            ctx: OnceLock::new(),
            summary: OnceLock::new(),
        }
    }

    pub fn attach(&self, ctx: Arc<CrawlContext>) {
        let _ = self.ctx.set(ctx);
    }

    pub fn current_status(&self) -> JobStatus {
        *self.status.borrow()
    }

    /// The job's summary, once it reached a terminal state
    pub fn summary(&self) -> Option<&CrawlSummary> {
        self.summary.get()
    }

    /// Results gathered so far, in completion order
    pub fn results(&self) -> Vec<PageResult> {
        self.ctx
            .get()
            .map(|ctx| ctx.sink.snapshot())
            .unwrap_or_default()
    }

    /// Publishes `next` if the lifecycle allows it from the current state
    fn transition(&self, next: JobState) -> bool {
        let moved = self.status.send_if_modified(|status| {
            if status.state.can_transition_to(next) {
                status.state = next;
                true
            } else {
                false
            }
        });
        if !moved {
            tracing::warn!(
                "Job {}: refused transition {} -> {}",
                self.id,
                self.current_status().state,
                next
            );
        }
        moved
    }

    /// Stores the summary and publishes the terminal state
    ///
    /// Only the first call has any effect, so the summary never changes once produced.
    fn finish(&self, summary: CrawlSummary) {
        let state = summary.final_state();
        if self.summary.set(summary).is_ok() {
            self.transition(state);
        }
    }
}

/// Runs one crawl job to completion
pub struct Coordinator {
    record: Arc<JobRecord>,
    ctx: Arc<CrawlContext>,
    seed: Url,
}

impl Coordinator {
    pub fn new(record: Arc<JobRecord>, ctx: Arc<CrawlContext>, seed: Url) -> Self {
        record.attach(Arc::clone(&ctx));
        Self { record, ctx, seed }
    }

    /// Drives the job from `Pending` to a terminal state and returns its summary
    pub async fn run(self) -> CrawlSummary {
        let job = Arc::clone(&self.ctx.job);
        let started_at = Utc::now();
        let started = Instant::now();

        if self.record.cancel.is_cancelled() {
            tracing::info!("Job {} cancelled before it started", job.id);
            return self.finish(TerminalReason::Cancelled, started_at, started);
        }

        self.record.transition(JobState::Running);
        tracing::info!(
            "Starting crawl job {} at {} (max depth {}, max pages {}, {} workers)",
            job.id,
            self.seed,
            job.max_depth,
            job.max_pages,
            job.workers
        );

        self.ctx.frontier.offer(&self.seed, 0, None);

        let pool = WorkerPool::new(job.workers);
        let run = pool.run(Arc::clone(&self.ctx));
        tokio::pin!(run);

        let timed_out = tokio::select! {
            _ = &mut run => false,
            _ = tokio::time::sleep(job.timeout) => {
                tracing::warn!("Job {} timed out after {:?}, draining workers", job.id, job.timeout);
                self.ctx.stop.cancel();
                run.await;
                true
            }
        };

        let frontier = &self.ctx.frontier;
        let reason = terminal_reason(
            timed_out,
            frontier.is_drained(),
            frontier.remaining_budget(),
            frontier.depth_rejections(),
        );

        self.finish(reason, started_at, started)
    }

    fn finish(
        &self,
        reason: TerminalReason,
        started_at: chrono::DateTime<Utc>,
        started: Instant,
    ) -> CrawlSummary {
        // Stops anything still waiting on the frontier
        self.ctx.stop.cancel();

        let results = self.ctx.sink.snapshot();
        let summary = CrawlSummary::tally(
            self.record.id,
            &results,
            self.ctx.robots_denied(),
            reason,
            started_at,
            started.elapsed(),
        );

        tracing::info!(
            "Job {} finished ({}): {} fetched, {} filtered, {} failed, {} robots-denied links in {:.2}s",
            summary.job_id,
            summary.terminal_reason,
            summary.pages_fetched,
            summary.pages_filtered,
            summary.pages_failed,
            summary.robots_denied,
            summary.elapsed.as_secs_f64()
        );

        self.record.finish(summary.clone());
        self.record.summary().cloned().unwrap_or(summary)
    }
}

/// Picks the reason a worker pool run ended
///
/// A pool that stopped without draining the frontier was stopped by the cancel token, so a
/// cancel arriving after the frontier already drained does not change the outcome.
fn terminal_reason(
    timed_out: bool,
    drained: bool,
    remaining_budget: usize,
    depth_rejections: usize,
) -> TerminalReason {
    if timed_out {
        TerminalReason::Timeout
    } else if !drained {
        TerminalReason::Cancelled
    } else if remaining_budget == 0 {
        TerminalReason::BudgetExhausted
    } else if depth_rejections > 0 {
        TerminalReason::DepthExhausted
    } else {
        TerminalReason::FrontierEmpty
    }
}
