//! Relevance scorer backed by an HTTP scoring service
//!
//! Request: `POST <endpoint>` with `{"text", "title", "image", "task", "labels"}`.
//! Response: `{"relevance": <f64>}`.

use crate::filter::scorer::{check_score, RelevanceScorer, ScoreRequest, ScoringTask};
use crate::ScorerError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

/// Longest text prefix sent to the scoring service, in characters
pub const MAX_TEXT_CHARS: usize = 8_000;

#[derive(Debug, Serialize)]
struct ScoreBody<'a> {
    text: &'a str,
    title: Option<&'a str>,
    image: Option<&'a str>,
    task: &'a str,
    labels: &'a [String],
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    relevance: f64,
}

/// Scores pages by calling a remote service
#[derive(Debug, Clone)]
pub struct HttpScorer {
    client: Client,
    endpoint: Url,
}

impl HttpScorer {
    pub fn new(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl RelevanceScorer for HttpScorer {
    async fn score(&self, request: &ScoreRequest, task: &ScoringTask) -> Result<f64, ScorerError> {
        let text = truncate_chars(&request.text, MAX_TEXT_CHARS);
        let body = ScoreBody {
            text,
            title: request.title.as_deref(),
            image: request.image.as_deref(),
            task: &task.description,
            labels: &task.labels,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| ScorerError::Backend(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScorerError::Backend(format!(
                "scoring service returned HTTP {}",
                status.as_u16()
            )));
        }

        let parsed: ScoreResponse = response
            .json()
            .await
            .map_err(|e| ScorerError::Backend(format!("invalid response: {}", e)))?;

        check_score(parsed.relevance)
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
