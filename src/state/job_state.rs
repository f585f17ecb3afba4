//! Crawl job lifecycle
//!
//! `Pending → Running → {Completed, Cancelled, Failed(timeout)}`. Terminal states are final.
use crate::state::{PageResult, PageStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Why a job failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The job's wall-clock timeout elapsed
    Timeout,
}

/// Lifecycle state of a crawl job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Cancelled,
    Failed(FailureReason),
}

impl JobState {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed(_))
    }

    /// Checks whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: JobState) -> bool {
        match (self, next) {
            (Self::Pending, Self::Running) => true,
            // A job cancelled before its workers start never runs
            (Self::Pending, Self::Cancelled) => true,
            (Self::Running, s) => s.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed(FailureReason::Timeout) => "failed(timeout)",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a job stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
    /// `max_pages` entries were dequeued
    BudgetExhausted,

    /// The frontier drained after dropping links beyond `max_depth`
    DepthExhausted,

    /// The frontier drained with nothing left to discover
    FrontierEmpty,

    Timeout,

    Cancelled,
}

impl TerminalReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BudgetExhausted => "budget exhausted",
            Self::DepthExhausted => "depth exhausted",
            Self::FrontierEmpty => "frontier empty",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        }
    }

    /// The terminal job state this reason leads to
    pub fn job_state(&self) -> JobState {
        match self {
            Self::Timeout => JobState::Failed(FailureReason::Timeout),
            Self::Cancelled => JobState::Cancelled,
            _ => JobState::Completed,
        }
    }
}

impl fmt::Display for TerminalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Non-blocking snapshot of a job's progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobStatus {
    pub state: JobState,

    /// Accepted pages so far
    pub pages_fetched: usize,
}

impl JobStatus {
    pub fn pending() -> Self {
        Self {
            state: JobState::Pending,
            pages_fetched: 0,
        }
    }
}

/// Final statistics of a job, produced exactly once when it reaches a terminal state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    pub job_id: Uuid,

    /// Pages with status `fetched`
    pub pages_fetched: usize,

    /// Pages with status `filtered_out`
    pub pages_filtered: usize,

    /// Pages with status `failed`
    pub pages_failed: usize,

    /// Discovered links never offered because robots.txt disallowed them
    pub robots_denied: usize,

    pub elapsed: Duration,

    pub terminal_reason: TerminalReason,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,
}

impl CrawlSummary {
    /// Builds a summary by tallying `results`
    pub fn tally(
        job_id: Uuid,
        results: &[PageResult],
        robots_denied: usize,
        terminal_reason: TerminalReason,
        started_at: DateTime<Utc>,
        elapsed: Duration,
    ) -> Self {
        let count = |status: PageStatus| results.iter().filter(|r| r.status == status).count();

        Self {
            job_id,
            pages_fetched: count(PageStatus::Fetched),
            pages_filtered: count(PageStatus::FilteredOut),
            pages_failed: count(PageStatus::Failed),
            robots_denied,
            elapsed,
            terminal_reason,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Total number of page results
    pub fn total_pages(&self) -> usize {
        self.pages_fetched + self.pages_filtered + self.pages_failed
    }

    /// Final job state implied by the terminal reason
    pub fn final_state(&self) -> JobState {
        self.terminal_reason.job_state()
    }
}
