//! Error types for the pipeline components.
//!
//! Store errors arrive as the backend's associated error type and are boxed
//! here so the component errors stay non-generic.

use sourcer_core::{access::AccessError, workflow::TriggerError};
use thiserror::Error;
use uuid::Uuid;

/// A boxed backend error.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

pub(crate) fn store_err<E>(err: E) -> StoreError
where
  E: std::error::Error + Send + Sync + 'static,
{
  Box::new(err)
}

/// Failure of a repository batch. Only the steps that must succeed for
/// anything to be written surface here; later steps degrade to counts.
#[derive(Debug, Error)]
pub enum RepositoryError {
  #[error("store error: {0}")]
  Store(#[source] StoreError),
}

#[derive(Debug, Error)]
pub enum ScoreError {
  #[error("not found: {0}")]
  NotFound(Uuid),

  #[error("search context is incomplete: {0}")]
  IncompleteContext(String),

  #[error("search criteria could not be parsed: {0}")]
  UnparseableCriteria(String),

  #[error("scoring call failed: {0}")]
  ScoringFailed(String),

  #[error(transparent)]
  Forbidden(#[from] AccessError),

  #[error("store error: {0}")]
  Store(#[source] StoreError),
}

#[derive(Debug, Error)]
pub enum EnrichCandidateError {
  #[error("search candidate not found: {0}")]
  SearchCandidateNotFound(Uuid),

  #[error("candidate not found: {0}")]
  CandidateNotFound(Uuid),

  #[error(transparent)]
  Forbidden(#[from] AccessError),

  #[error("store error: {0}")]
  Store(#[source] StoreError),
}

#[derive(Debug, Error)]
pub enum PlannerError {
  #[error("search not found: {0}")]
  SearchNotFound(Uuid),

  #[error(transparent)]
  Forbidden(#[from] AccessError),

  #[error("no strategy is eligible to run again")]
  NoStrategies,

  #[error(transparent)]
  Trigger(#[from] TriggerError),

  #[error("store error: {0}")]
  Store(#[source] StoreError),
}

#[derive(Debug, Error)]
pub enum LaunchError {
  #[error("invalid search: {0}")]
  Validation(String),

  #[error(transparent)]
  Forbidden(#[from] AccessError),

  #[error(transparent)]
  Trigger(#[from] TriggerError),

  #[error("store error: {0}")]
  Store(#[source] StoreError),
}
