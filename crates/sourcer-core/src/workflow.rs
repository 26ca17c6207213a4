//! The background sourcing workflow trigger.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// One sourcing round: run `strategy_ids` in order for `search_id`.
///
/// The same strategy id may appear more than once.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowRequest {
  pub search_id:    Uuid,
  pub query_text:   String,
  pub criteria:     serde_json::Value,
  pub strategy_ids: Vec<Uuid>,
}

#[derive(Debug, Error)]
#[error("failed to trigger sourcing workflow: {0}")]
pub struct TriggerError(pub String);

/// Starts a sourcing round detached from the caller. Returning `Ok` means the
/// round was accepted, not that it finished.
#[async_trait]
pub trait WorkflowTrigger: Send + Sync {
  async fn trigger(&self, request: WorkflowRequest) -> Result<(), TriggerError>;
}
