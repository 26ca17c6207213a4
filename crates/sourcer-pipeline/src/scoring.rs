//! Scoring Orchestrator: score one or many linked candidates against their
//! search's criteria.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use sourcer_core::{
  access::AccessGuard,
  candidate::SearchCandidate,
  events::{EventSink, SearchEvent},
  scoring::{ScoreRequest, ScoringService},
  store::CandidateStore,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ScoreError, store_err};

/// Counts reported by [`ScoringOrchestrator::score_batch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
  pub requested: usize,
  pub scored:    usize,
  pub errors:    usize,
}

/// A persisted score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
  pub search_candidate_id: Uuid,
  pub candidate_id:        Uuid,
  pub match_score:         f64,
  pub notes:               Value,
}

pub struct ScoringOrchestrator<S> {
  store:  Arc<S>,
  scorer: Arc<dyn ScoringService>,
  guard:  Arc<dyn AccessGuard>,
  events: Arc<dyn EventSink>,
}

impl<S> Clone for ScoringOrchestrator<S> {
  fn clone(&self) -> Self {
    Self {
      store:  self.store.clone(),
      scorer: self.scorer.clone(),
      guard:  self.guard.clone(),
      events: self.events.clone(),
    }
  }
}

impl<S: CandidateStore> ScoringOrchestrator<S> {
  pub fn new(
    store: Arc<S>,
    scorer: Arc<dyn ScoringService>,
    guard: Arc<dyn AccessGuard>,
    events: Arc<dyn EventSink>,
  ) -> Self {
    Self { store, scorer, guard, events }
  }

  /// Score a single search candidate.
  pub async fn score_one(&self, search_candidate_id: Uuid) -> Result<ScoredCandidate, ScoreError> {
    let link = self.load_link(search_candidate_id).await?;
    self.guard.assert_read_access(link.search_id).await?;
    self.score_link(link).await
  }

  /// Score `ids` concurrently, or every unscored link of the search when `ids`
  /// is empty. Failures are counted, never propagated.
  pub async fn score_batch(
    &self,
    search_id: Uuid,
    ids: Vec<Uuid>,
  ) -> Result<BatchReport, ScoreError> {
    if self.store.get_search(search_id).await.map_err(|e| ScoreError::Store(store_err(e)))?.is_none()
    {
      return Err(ScoreError::NotFound(search_id));
    }
    self.guard.assert_read_access(search_id).await?;

    let ids = if ids.is_empty() {
      self
        .store
        .unscored_search_candidate_ids(search_id)
        .await
        .map_err(|e| ScoreError::Store(store_err(e)))?
    } else {
      ids
    };

    let tasks = ids.iter().map(|id| async move {
      let link = self.load_link(*id).await?;
      if link.search_id != search_id {
        return Err(ScoreError::NotFound(*id));
      }
      self.score_link(link).await
    });
    let results = join_all(tasks).await;

    let mut report = BatchReport { requested: ids.len(), ..Default::default() };
    for (id, result) in ids.iter().zip(results) {
      match result {
        Ok(_) => report.scored += 1,
        Err(e) => {
          warn!(%search_id, search_candidate_id = %id, error = %e, "scoring task failed");
          report.errors += 1;
        }
      }
    }
    info!(%search_id, requested = report.requested, scored = report.scored, errors = report.errors, "batch scoring finished");
    Ok(report)
  }

  async fn load_link(&self, id: Uuid) -> Result<SearchCandidate, ScoreError> {
    self
      .store
      .get_search_candidate(id)
      .await
      .map_err(|e| ScoreError::Store(store_err(e)))?
      .ok_or(ScoreError::NotFound(id))
  }

  async fn score_link(&self, link: SearchCandidate) -> Result<ScoredCandidate, ScoreError> {
    let candidate = self
      .store
      .get_candidate(link.candidate_id)
      .await
      .map_err(|e| ScoreError::Store(store_err(e)))?
      .ok_or(ScoreError::NotFound(link.candidate_id))?;
    let search = self
      .store
      .get_search(link.search_id)
      .await
      .map_err(|e| ScoreError::Store(store_err(e)))?
      .ok_or_else(|| ScoreError::IncompleteContext(format!("search {} is missing", link.search_id)))?;

    let criteria = parse_criteria(search.criteria)?;
    let request = ScoreRequest {
      candidate_id: candidate.candidate_id,
      profile: candidate.profile(),
      criteria,
      query_text: search.query_text,
    };

    let result = self
      .scorer
      .score(request)
      .await
      .map_err(|e| ScoreError::ScoringFailed(e.to_string()))?;
    if !result.match_score.is_finite() {
      return Err(ScoreError::ScoringFailed(format!("non-finite score {}", result.match_score)));
    }
    let score = result.match_score.clamp(0.0, 100.0);

    self
      .store
      .record_score(link.search_candidate_id, score, result.notes.clone())
      .await
      .map_err(|e| ScoreError::Store(store_err(e)))?;
    debug!(search_candidate_id = %link.search_candidate_id, score, "score recorded");

    match self.store.scoring_progress(link.search_id).await {
      Ok(progress) => self.events.publish(link.search_id, SearchEvent::ScoreUpdated {
        candidate_id: candidate.candidate_id,
        search_candidate_id: link.search_candidate_id,
        score,
        scored: progress.scored,
        total: progress.total,
      }),
      Err(e) => warn!(search_id = %link.search_id, error = %e, "could not read scoring progress"),
    }

    Ok(ScoredCandidate {
      search_candidate_id: link.search_candidate_id,
      candidate_id: candidate.candidate_id,
      match_score: score,
      notes: result.notes,
    })
  }
}

/// Criteria stored as an encoded JSON string are decoded; anything that is not
/// a JSON object afterwards is unusable.
fn parse_criteria(criteria: Value) -> Result<Value, ScoreError> {
  let criteria = match criteria {
    Value::Null => return Err(ScoreError::IncompleteContext("search has no criteria".into())),
    Value::String(encoded) => serde_json::from_str(&encoded)
      .map_err(|e| ScoreError::UnparseableCriteria(e.to_string()))?,
    other => other,
  };
  match criteria {
    Value::Object(_) => Ok(criteria),
    Value::Null => Err(ScoreError::IncompleteContext("search has no criteria".into())),
    other => Err(ScoreError::UnparseableCriteria(format!("expected an object, got {other}"))),
  }
}
