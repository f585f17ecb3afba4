//! The relevance scoring capability
//!
//! One implementation per backend; the engine picks a backend by the name a job's
//! `ScoringSettings` carries, never by inspecting content types.

use crate::config::ScoringSettings;
use crate::ScorerError;
use async_trait::async_trait;
use serde::Serialize;

/// Page content handed to a scorer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRequest {
    pub text: String,
    pub title: Option<String>,
    /// Representative image (the page's first image), as URL or local path
    pub image: Option<String>,
}

/// What "relevant" means for a crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoringTask {
    pub description: String,
    pub labels: Vec<String>,
}

impl From<&ScoringSettings> for ScoringTask {
    fn from(settings: &ScoringSettings) -> Self {
        Self {
            description: settings.task.clone(),
            labels: settings.labels.clone(),
        }
    }
}

/// Scores page content against a task
///
/// Implementations return a relevance in `[0, 1]`. The caller bounds every call with its own
/// timeout, so implementations need not.
#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    async fn score(&self, request: &ScoreRequest, task: &ScoringTask) -> Result<f64, ScorerError>;
}

/// Rejects scores outside `[0, 1]`, including NaN
pub fn check_score(score: f64) -> Result<f64, ScorerError> {
    if (0.0..=1.0).contains(&score) {
        Ok(score)
    } else {
        Err(ScorerError::InvalidScore(score))
    }
}
