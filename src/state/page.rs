//! Per-page crawl results
use crate::filter::RelevanceBasis;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Outcome of processing one dequeued URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    /// Fetched, extracted and accepted by the relevance filter
    Fetched,

    /// Fetch or content-type check failed; see `PageResult::error`
    Failed,

    /// Rejected by the relevance filter or by robots.txt; see `PageResult::basis`
    FilteredOut,
}

impl PageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetched => "fetched",
            Self::Failed => "failed",
            Self::FilteredOut => "filtered_out",
        }
    }

    /// Returns all possible page statuses
    pub fn all() -> [Self; 3] {
        [Self::Fetched, Self::FilteredOut, Self::Failed]
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An image referenced by a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageImage {
    /// Absolute image URL
    pub url: String,

    /// `alt` attribute, if present
    pub alt: Option<String>,

    /// `title` attribute, if present
    pub title: Option<String>,

    /// Where the image was stored, when image download is enabled and succeeded
    pub local_path: Option<String>,
}

/// Result record for one processed page
///
/// Created by a worker when processing of a dequeued entry finishes; never modified after
/// it is appended to the result sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult {
    /// Normalized URL that was dequeued
    pub url: String,

    /// URL after redirects, when it differs from `url`
    pub final_url: Option<String>,

    /// Link depth from the seed
    pub depth: u32,

    /// Page this URL was discovered on (None for the seed)
    pub parent: Option<String>,

    pub status: PageStatus,

    pub title: Option<String>,

    /// Visible text content
    pub text: String,

    /// Outbound links, absolute and deduplicated
    pub links: Vec<String>,

    pub images: Vec<PageImage>,

    /// `<meta>` name/property to content pairs
    pub metadata: BTreeMap<String, String>,

    /// Relevance score, when a scorer produced one
    pub score: Option<f64>,

    /// Why the relevance filter accepted or rejected the page
    pub basis: Option<RelevanceBasis>,

    /// Time spent in the fetcher
    pub fetch_duration: Duration,

    pub fetched_at: DateTime<Utc>,

    /// Error detail for failed pages
    pub error: Option<String>,
}

impl PageResult {
    /// Creates an empty result for a dequeued URL
    pub fn new(url: &Url, depth: u32, parent: Option<&Url>, status: PageStatus) -> Self {
        Self {
            url: url.to_string(),
            final_url: None,
            depth,
            parent: parent.map(Url::to_string),
            status,
            title: None,
            text: String::new(),
            links: Vec::new(),
            images: Vec::new(),
            metadata: BTreeMap::new(),
            score: None,
            basis: None,
            fetch_duration: Duration::ZERO,
            fetched_at: Utc::now(),
            error: None,
        }
    }

    /// Creates a failed result carrying `error`
    pub fn failed(
        url: &Url,
        depth: u32,
        parent: Option<&Url>,
        error: impl fmt::Display,
    ) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(url, depth, parent, PageStatus::Failed)
        }
    }

    /// Returns true if the page passed every filter
    pub fn is_accepted(&self) -> bool {
        self.status == PageStatus::Fetched
    }
}
