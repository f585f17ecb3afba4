//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `HostState`: per-host politeness (last fetch, crawl delay), owned by the frontier
//! - `JobState` / `TerminalReason`: the job lifecycle and why it ended
//! - `PageResult`: the immutable record a worker produces for each processed page
//! - `CrawlSummary`: final job statistics

mod host_state;
mod job_state;
mod page;

pub use host_state::HostState;
pub use job_state::{CrawlSummary, FailureReason, JobState, JobStatus, TerminalReason};
pub use page::{PageImage, PageResult, PageStatus};
