//! Error type for `sourcer-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] sourcer_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("search not found: {0}")]
  SearchNotFound(uuid::Uuid),

  #[error("strategy not found: {0}")]
  StrategyNotFound(uuid::Uuid),

  #[error("candidate not found: {0}")]
  CandidateNotFound(uuid::Uuid),

  #[error("search candidate not found: {0}")]
  SearchCandidateNotFound(uuid::Uuid),
}

impl Error {
  /// Whether this error means the addressed row does not exist.
  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Self::SearchNotFound(_)
        | Self::StrategyNotFound(_)
        | Self::CandidateNotFound(_)
        | Self::SearchCandidateNotFound(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
