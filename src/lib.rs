//! Sift: a bounded, polite, relevance-filtering web crawling engine
//!
//! This crate implements a crawl engine that, given a seed URL, a depth limit and optional
//! content filters, discovers and fetches a bounded set of pages in parallel, extracts links
//! and content, applies keyword/AI-relevance filtering, and produces a deduplicated,
//! depth-annotated result set.

pub mod config;
pub mod crawler;
pub mod filter;
pub mod output;
pub mod robots;
pub mod state;
pub mod url;

use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Main error type for Sift operations
#[derive(Debug, Error)]
pub enum SiftError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Scorer error: {0}")]
    Scorer(#[from] ScorerError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Unknown crawl job {0}")]
    UnknownJob(Uuid),

    #[error("Crawl job {0} has not reached a terminal state")]
    JobNotFinished(Uuid),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
///
/// Every variant is an `InvalidConfig` condition: it is reported by the call that
/// received the configuration and never reaches a running job.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),

    #[error("No relevance scorer registered under '{0}'")]
    UnknownScorer(String),
}

/// Per-page fetch failures
///
/// These are recorded in the failed page's result and never abort a job.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    #[error("HTTP status {status}")]
    Status { status: u16 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Expected HTML, got {0}")]
    ContentMismatch(String),

    #[error("Failed to read response body: {0}")]
    Body(String),
}

/// Relevance scorer failures
///
/// The relevance filter turns every one of these into a fail-open acceptance.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ScorerError {
    #[error("Scorer timed out after {0:?}")]
    Timeout(Duration),

    #[error("Scorer backend error: {0}")]
    Backend(String),

    #[error("Scorer returned {0}, expected a value in [0, 1]")]
    InvalidScore(f64),
}

/// URL-specific errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Sift operations
pub type Result<T> = std::result::Result<T, SiftError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{CrawlJob, ScoringSettings};
pub use crawler::{CrawlEngine, Fetcher, HttpFetcher, JobHandle};
pub use filter::{RelevanceBasis, RelevanceScorer, ScoreRequest, ScoringTask};
pub use state::{CrawlSummary, JobState, JobStatus, PageResult, PageStatus, TerminalReason};
pub use crate::url::{host_key, normalize_url};
