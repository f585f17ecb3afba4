//! Output module for reporting finished crawl jobs
//!
//! This module handles:
//! - Printing a job summary with per-status, per-depth and error breakdowns
//! - Exporting a job's results as JSON
//!
//! The engine itself never writes anything; these are used by the CLI on the results
//! returned from a terminal job.

mod export;
pub mod stats;

pub use export::write_results_json;
pub use stats::{print_statistics, CrawlStatistics};
