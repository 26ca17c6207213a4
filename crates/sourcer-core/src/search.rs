//! Searches and the sourcing strategies they own.
//!
//! A search is one user-initiated sourcing session. Its criteria arrive already
//! structured (query parsing happens upstream) and are kept as an opaque JSON
//! value. Each strategy is one parameterised way of querying the providers;
//! a strategy may be run more than once over the life of a search.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

// ─── Search status ───────────────────────────────────────────────────────────

/// Lifecycle state of a [`Search`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStatus {
  Created,
  Processing,
  Pending,
  Generating,
  Generated,
  Executing,
  Polling,
  Completed,
  Failed,
  Error,
}

impl SearchStatus {
  /// The string stored in the `status` column and sent in events.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Created => "created",
      Self::Processing => "processing",
      Self::Pending => "pending",
      Self::Generating => "generating",
      Self::Generated => "generated",
      Self::Executing => "executing",
      Self::Polling => "polling",
      Self::Completed => "completed",
      Self::Failed => "failed",
      Self::Error => "error",
    }
  }

  /// `completed` and `failed` end the lifecycle.
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Completed | Self::Failed)
  }
}

impl fmt::Display for SearchStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for SearchStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "created" => Ok(Self::Created),
      "processing" => Ok(Self::Processing),
      "pending" => Ok(Self::Pending),
      "generating" => Ok(Self::Generating),
      "generated" => Ok(Self::Generated),
      "executing" => Ok(Self::Executing),
      "polling" => Ok(Self::Polling),
      "completed" => Ok(Self::Completed),
      "failed" => Ok(Self::Failed),
      "error" => Ok(Self::Error),
      other => Err(Error::UnknownSearchStatus(other.to_owned())),
    }
  }
}

// ─── Search ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Search {
  pub search_id:       Uuid,
  pub organization_id: Uuid,
  /// The free-text query as the user typed it.
  pub query_text:      String,
  /// Structured criteria produced upstream; opaque to this pipeline.
  pub criteria:        serde_json::Value,
  pub status:          SearchStatus,
  /// 0..=100.
  pub progress:        u8,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

/// Input to [`crate::store::CandidateStore::create_search`].
#[derive(Debug, Clone)]
pub struct NewSearch {
  pub organization_id: Uuid,
  pub query_text:      String,
  pub criteria:        serde_json::Value,
}

// ─── Strategies ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyStatus {
  Pending,
  Running,
  Completed,
  Failed,
}

impl StrategyStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Running => "running",
      Self::Completed => "completed",
      Self::Failed => "failed",
    }
  }
}

impl FromStr for StrategyStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "pending" => Ok(Self::Pending),
      "running" => Ok(Self::Running),
      "completed" => Ok(Self::Completed),
      "failed" => Ok(Self::Failed),
      other => Err(Error::UnknownStrategyStatus(other.to_owned())),
    }
  }
}

/// One parameterised sourcing attempt within a search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcingStrategy {
  pub strategy_id: Uuid,
  pub search_id:   Uuid,
  /// Provider-facing parameters (keywords, filters, titles...). Opaque here.
  pub params:      serde_json::Value,
  pub status:      StrategyStatus,
  /// Number of times this strategy has been started. Used as the page
  /// offset of the next run so re-runs reach past earlier results.
  pub run_count:   u32,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_strings_roundtrip() {
    for status in [
      SearchStatus::Created,
      SearchStatus::Processing,
      SearchStatus::Pending,
      SearchStatus::Generating,
      SearchStatus::Generated,
      SearchStatus::Executing,
      SearchStatus::Polling,
      SearchStatus::Completed,
      SearchStatus::Failed,
      SearchStatus::Error,
    ] {
      assert_eq!(status.as_str().parse::<SearchStatus>().unwrap(), status);
    }
  }

  #[test]
  fn only_completed_and_failed_are_terminal() {
    assert!(SearchStatus::Completed.is_terminal());
    assert!(SearchStatus::Failed.is_terminal());
    assert!(!SearchStatus::Processing.is_terminal());
    assert!(!SearchStatus::Error.is_terminal());
  }

  #[test]
  fn unknown_strategy_status_is_rejected() {
    let err = "paused".parse::<StrategyStatus>().unwrap_err();
    assert!(matches!(err, Error::UnknownStrategyStatus(s) if s == "paused"));
  }
}
