//! Error types for `sourcer-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown search status: {0:?}")]
  UnknownSearchStatus(String),

  #[error("unknown strategy status: {0:?}")]
  UnknownStrategyStatus(String),

  #[error("unknown candidate status: {0:?}")]
  UnknownCandidateStatus(String),

  #[error("unknown sort key: {0:?}")]
  UnknownSortKey(String),

  #[error("invalid profile url: {0:?}")]
  InvalidProfileUrl(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
