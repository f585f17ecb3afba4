//! Statistics over a job's page results
//!
//! This module derives breakdowns (status, depth, host, error) from the result
//! sequence of a finished job and prints them alongside its summary.

use crate::state::{CrawlSummary, PageResult, PageStatus};
use crate::url::host_key;
use std::collections::{BTreeMap, HashMap, HashSet};
use url::Url;

/// Number of error messages listed in the printed report
const TOP_ERRORS: usize = 10;

/// Breakdown of one job's results
#[derive(Debug, Clone, Default)]
pub struct CrawlStatistics {
    /// Total number of page results
    pub total_pages: usize,

    /// Count of pages by status
    pub pages_by_status: HashMap<PageStatus, usize>,

    /// Count of pages by depth
    pub pages_by_depth: BTreeMap<u32, usize>,

    /// Number of distinct hosts among the results
    pub unique_hosts: usize,

    /// Total number of outbound links on accepted and filtered pages
    pub total_links: usize,

    /// Pages accepted only because the scorer failed
    pub fail_open_pages: usize,

    /// Error messages of failed pages and their counts
    pub error_summary: HashMap<String, usize>,
}

impl CrawlStatistics {
    pub fn from_results(results: &[PageResult]) -> Self {
        let mut stats = Self {
            total_pages: results.len(),
            ..Self::default()
        };
        let mut hosts = HashSet::new();

        for result in results {
            *stats.pages_by_status.entry(result.status).or_insert(0) += 1;
            *stats.pages_by_depth.entry(result.depth).or_insert(0) += 1;
            stats.total_links += result.links.len();

            if let Some(host) = Url::parse(&result.url).ok().as_ref().and_then(host_key) {
                hosts.insert(host);
            }
            if result.basis.as_ref().is_some_and(|b| b.is_fail_open()) {
                stats.fail_open_pages += 1;
            }
            if let Some(error) = &result.error {
                *stats.error_summary.entry(error.clone()).or_insert(0) += 1;
            }
        }

        stats.unique_hosts = hosts.len();
        stats
    }

    /// Number of pages with `status`
    pub fn count(&self, status: PageStatus) -> usize {
        self.pages_by_status.get(&status).copied().unwrap_or(0)
    }

    /// Share of results that were accepted, in percent
    pub fn acceptance_rate(&self) -> f64 {
        if self.total_pages == 0 {
            return 0.0;
        }
        self.count(PageStatus::Fetched) as f64 / self.total_pages as f64 * 100.0
    }
}

/// Prints a job summary and its result statistics to stdout
pub fn print_statistics(summary: &CrawlSummary, stats: &CrawlStatistics) {
    println!("=== Crawl Summary ===\n");

    println!("Job:");
    println!("  Id: {}", summary.job_id);
    println!("  Outcome: {} ({})", summary.final_state(), summary.terminal_reason);
    println!("  Started: {}", summary.started_at.to_rfc3339());
    println!("  Finished: {}", summary.finished_at.to_rfc3339());
    println!("  Elapsed: {:.2}s", summary.elapsed.as_secs_f64());
    println!();

    println!("Overview:");
    println!("  Pages processed: {}", stats.total_pages);
    println!("  Unique hosts: {}", stats.unique_hosts);
    println!("  Links found: {}", stats.total_links);
    println!("  Links denied by robots.txt: {}", summary.robots_denied);
    println!();

    println!("Pages by Status:");
    for status in PageStatus::all() {
        let count = stats.count(status);
        let percentage = if stats.total_pages > 0 {
            count as f64 / stats.total_pages as f64 * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    if stats.fail_open_pages > 0 {
        println!("  (accepted after scorer failure: {})", stats.fail_open_pages);
    }
    println!();

    if !stats.pages_by_depth.is_empty() {
        println!("Pages by Depth:");
        for (depth, count) in &stats.pages_by_depth {
            println!("  {}: {}", depth, count);
        }
        println!();
    }

    if !stats.error_summary.is_empty() {
        println!("Error Summary:");
        let mut error_counts: Vec<_> = stats.error_summary.iter().collect();
        error_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (error, count) in error_counts.into_iter().take(TOP_ERRORS) {
            println!("  {}: {}", error, count);
        }
        println!();
    }

    println!(
        "Acceptance Rate: {:.1}% ({} / {} pages accepted)",
        stats.acceptance_rate(),
        stats.count(PageStatus::Fetched),
        stats.total_pages
    );
}
