//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use sourcer_core::access::AccessError;
use sourcer_pipeline::error::{EnrichCandidateError, LaunchError, PlannerError, ScoreError};
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  /// The request was well formed but the search cannot be acted on.
  #[error("unprocessable: {0}")]
  Unprocessable(String),

  /// A collaborator (scorer, workflow runner) failed.
  #[error("upstream failure: {0}")]
  Upstream(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub(crate) fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::Unprocessable(m) => (StatusCode::UNPROCESSABLE_ENTITY, m.clone()),
      ApiError::Upstream(m) => (StatusCode::BAD_GATEWAY, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

// ─── Conversions from pipeline errors ────────────────────────────────────────

impl From<AccessError> for ApiError {
  fn from(e: AccessError) -> Self { ApiError::Forbidden(e.0) }
}

impl From<ScoreError> for ApiError {
  fn from(e: ScoreError) -> Self {
    match e {
      ScoreError::NotFound(id) => ApiError::NotFound(format!("{id} not found")),
      ScoreError::IncompleteContext(_) | ScoreError::UnparseableCriteria(_) => {
        ApiError::Unprocessable(e.to_string())
      }
      ScoreError::ScoringFailed(m) => ApiError::Upstream(m),
      ScoreError::Forbidden(e) => e.into(),
      ScoreError::Store(e) => ApiError::Store(e),
    }
  }
}

impl From<PlannerError> for ApiError {
  fn from(e: PlannerError) -> Self {
    match e {
      PlannerError::SearchNotFound(id) => ApiError::NotFound(format!("search {id} not found")),
      PlannerError::Forbidden(e) => e.into(),
      PlannerError::NoStrategies => ApiError::Unprocessable(e.to_string()),
      PlannerError::Trigger(e) => ApiError::Upstream(e.to_string()),
      PlannerError::Store(e) => ApiError::Store(e),
    }
  }
}

impl From<LaunchError> for ApiError {
  fn from(e: LaunchError) -> Self {
    match e {
      LaunchError::Validation(m) => ApiError::BadRequest(m),
      LaunchError::Forbidden(e) => e.into(),
      LaunchError::Trigger(e) => ApiError::Upstream(e.to_string()),
      LaunchError::Store(e) => ApiError::Store(e),
    }
  }
}

impl From<EnrichCandidateError> for ApiError {
  fn from(e: EnrichCandidateError) -> Self {
    match e {
      EnrichCandidateError::SearchCandidateNotFound(id) => {
        ApiError::NotFound(format!("search candidate {id} not found"))
      }
      EnrichCandidateError::CandidateNotFound(id) => {
        ApiError::NotFound(format!("candidate {id} not found"))
      }
      EnrichCandidateError::Forbidden(e) => e.into(),
      EnrichCandidateError::Store(e) => ApiError::Store(e),
    }
  }
}
