//! Events published on a search's channel as side effects of pipeline
//! operations.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::search::SearchStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum SearchEvent {
  #[serde(rename = "status.updated")]
  StatusUpdated {
    status:   SearchStatus,
    message:  String,
    progress: u8,
  },
  #[serde(rename = "score.updated")]
  ScoreUpdated {
    #[serde(rename = "candidateId")]
    candidate_id:        Uuid,
    #[serde(rename = "searchCandidateId")]
    search_candidate_id: Uuid,
    score:               f64,
    scored:              u64,
    total:               u64,
  },
}

impl SearchEvent {
  /// The event name used on the wire (SSE `event:` field).
  pub fn name(&self) -> &'static str {
    match self {
      Self::StatusUpdated { .. } => "status.updated",
      Self::ScoreUpdated { .. } => "score.updated",
    }
  }
}

/// Destination for per-search events. Publishing never fails the caller.
pub trait EventSink: Send + Sync {
  fn publish(&self, search_id: Uuid, event: SearchEvent);
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
  fn publish(&self, _search_id: Uuid, _event: SearchEvent) {}
}
