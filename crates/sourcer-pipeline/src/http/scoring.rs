//! Scoring capability over HTTP.

use async_trait::async_trait;
use serde::Deserialize;
use sourcer_core::scoring::{ScoreRequest, ScoreResult, ScoringError, ScoringService};
use url::Url;

use super::authorize;

#[derive(Clone)]
pub struct HttpScoringService {
  client:   reqwest::Client,
  endpoint: Url,
  api_key:  Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
  #[serde(alias = "matchScore", alias = "score")]
  match_score: f64,
  #[serde(default, alias = "structuredNotes", alias = "notes_json")]
  notes:       serde_json::Value,
}

impl HttpScoringService {
  pub fn new(client: reqwest::Client, endpoint: Url, api_key: Option<String>) -> Self {
    Self { client, endpoint, api_key }
  }
}

#[async_trait]
impl ScoringService for HttpScoringService {
  async fn score(&self, request: ScoreRequest) -> Result<ScoreResult, ScoringError> {
    let resp = authorize(self.client.post(self.endpoint.clone()), self.api_key.as_deref())
      .json(&request)
      .send()
      .await
      .map_err(|e| ScoringError::Transport(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(ScoringError::Status { status: status.as_u16(), body });
    }

    let parsed: ScoreResponse =
      resp.json().await.map_err(|e| ScoringError::Schema(e.to_string()))?;
    Ok(ScoreResult { match_score: parsed.match_score, notes: parsed.notes })
  }
}
