//! The external scoring capability.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct ScoreRequest {
  pub candidate_id: Uuid,
  /// See [`crate::candidate::Candidate::profile`].
  pub profile:      serde_json::Value,
  pub criteria:     serde_json::Value,
  pub query_text:   String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
  /// 0..=100.
  pub match_score: f64,
  pub notes:       serde_json::Value,
}

#[derive(Debug, Error)]
pub enum ScoringError {
  #[error("scoring service is not configured: {0}")]
  Configuration(String),

  #[error("transport error: {0}")]
  Transport(String),

  #[error("scoring service returned status {status}: {body}")]
  Status { status: u16, body: String },

  #[error("unexpected scoring response: {0}")]
  Schema(String),
}

#[async_trait]
pub trait ScoringService: Send + Sync {
  async fn score(&self, request: ScoreRequest) -> Result<ScoreResult, ScoringError>;
}
