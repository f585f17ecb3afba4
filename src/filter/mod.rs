//! Relevance filtering of extracted pages
//!
//! The keyword gate runs first (any keyword accepts). Pages that pass it are scored when a
//! scorer is bound; the score must reach the threshold. A scorer that times out, errors or
//! returns an invalid value never rejects a page: the page is accepted and the verdict's basis
//! records the failure.

mod http_scorer;
mod keyword;
mod scorer;

pub use http_scorer::HttpScorer;
pub use keyword::KeywordMatcher;
pub use scorer::{check_score, RelevanceScorer, ScoreRequest, ScoringTask};

use crate::config::ScoringSettings;
use crate::ScorerError;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Why a page was accepted or rejected
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelevanceBasis {
    /// No filter configured
    Unfiltered,

    /// Accepted by a keyword (and no scorer configured)
    KeywordMatch { keyword: String },

    /// No keyword found in text or title
    NoKeywordMatch,

    /// Scorer returned a score at or above the threshold
    ScoreAboveThreshold { threshold: f64 },

    /// Scorer returned a score below the threshold
    ScoreBelowThreshold { threshold: f64 },

    /// Scorer failed; the page was accepted anyway
    ScorerFailOpen { error: String },

    /// robots.txt disallowed the URL when it was dequeued
    RobotsDenied,

    /// A redirect landed on a page this job had already processed
    DuplicateTarget,
}

impl RelevanceBasis {
    /// Returns true if the page was accepted because the scorer failed
    pub fn is_fail_open(&self) -> bool {
        matches!(self, Self::ScorerFailOpen { .. })
    }
}

/// Outcome of [`RelevanceFilter::accept`]
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub accepted: bool,
    pub score: Option<f64>,
    pub basis: RelevanceBasis,
}

impl Verdict {
    fn accept(basis: RelevanceBasis) -> Self {
        Self {
            accepted: true,
            score: None,
            basis,
        }
    }

    fn reject(basis: RelevanceBasis) -> Self {
        Self {
            accepted: false,
            score: None,
            basis,
        }
    }
}

/// A scorer together with the job settings it is called under
#[derive(Clone)]
pub struct ScorerBinding {
    pub scorer: Arc<dyn RelevanceScorer>,
    pub task: ScoringTask,
    pub threshold: f64,
    pub timeout: Duration,
}

impl ScorerBinding {
    pub fn new(scorer: Arc<dyn RelevanceScorer>, settings: &ScoringSettings) -> Self {
        Self {
            scorer,
            task: ScoringTask::from(settings),
            threshold: settings.threshold,
            timeout: settings.timeout,
        }
    }
}

/// Per-job relevance filter
#[derive(Clone, Default)]
pub struct RelevanceFilter {
    keywords: KeywordMatcher,
    scorer: Option<ScorerBinding>,
}

impl RelevanceFilter {
    pub fn new<S: AsRef<str>>(keywords: &[S], scorer: Option<ScorerBinding>) -> Self {
        Self {
            keywords: KeywordMatcher::new(keywords),
            scorer,
        }
    }

    /// Decides whether a page is relevant
    pub async fn accept(&self, page: &ScoreRequest) -> Verdict {
        let keyword_basis = if self.keywords.is_empty() {
            None
        } else {
            match self.keywords.first_match(&page.text, page.title.as_deref()) {
                Some(keyword) => Some(RelevanceBasis::KeywordMatch {
                    keyword: keyword.to_string(),
                }),
                None => return Verdict::reject(RelevanceBasis::NoKeywordMatch),
            }
        };

        let Some(binding) = &self.scorer else {
            return Verdict::accept(keyword_basis.unwrap_or(RelevanceBasis::Unfiltered));
        };

        match self.call_scorer(binding, page).await {
            Ok(score) => {
                debug!("Scored page at {:.3} (threshold {})", score, binding.threshold);
                let basis = if score >= binding.threshold {
                    RelevanceBasis::ScoreAboveThreshold {
                        threshold: binding.threshold,
                    }
                } else {
                    RelevanceBasis::ScoreBelowThreshold {
                        threshold: binding.threshold,
                    }
                };
                Verdict {
                    accepted: score >= binding.threshold,
                    score: Some(score),
                    basis,
                }
            }
            Err(e) => {
                warn!("Relevance scorer failed, accepting page: {}", e);
                Verdict::accept(RelevanceBasis::ScorerFailOpen {
                    error: e.to_string(),
                })
            }
        }
    }

    async fn call_scorer(&self, binding: &ScorerBinding, page: &ScoreRequest) -> Result<f64, ScorerError> {
        match tokio::time::timeout(binding.timeout, binding.scorer.score(page, &binding.task)).await {
            Ok(result) => check_score(result?),
            Err(_) => Err(ScorerError::Timeout(binding.timeout)),
        }
    }
}
