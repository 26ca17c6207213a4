//! In-process sourcing workflow.
//!
//! [`LocalWorkflow`] accepts a round, spawns it on the runtime and returns
//! immediately. The round runs each scheduled strategy in order, persists what
//! the providers return, scores everything still unscored and finally settles
//! the search in a terminal status.

use std::sync::Arc;

use async_trait::async_trait;
use sourcer_core::{
  events::{EventSink, SearchEvent},
  provider::SourceQuery,
  search::{SearchStatus, StrategyStatus},
  store::CandidateStore,
  workflow::{TriggerError, WorkflowRequest, WorkflowTrigger},
};
use tracing::{Instrument as _, error, info, info_span, warn};
use uuid::Uuid;

use crate::{
  aggregator::SourceAggregator,
  repository::{CandidateRepository, PersistReport},
  scoring::ScoringOrchestrator,
};

const SOURCING_START: u8 = 5;
const SOURCING_END: u8 = 85;
const SCORING_START: u8 = 90;

/// What one round achieved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundReport {
  pub runs:        usize,
  pub failed_runs: usize,
  pub saved:       usize,
  pub linked:      usize,
  pub scored:      usize,
  pub final_total: u64,
}

pub struct LocalWorkflow<S> {
  store:      Arc<S>,
  aggregator: Arc<SourceAggregator>,
  repository: CandidateRepository<S>,
  scoring:    ScoringOrchestrator<S>,
  events:     Arc<dyn EventSink>,
}

impl<S> Clone for LocalWorkflow<S> {
  fn clone(&self) -> Self {
    Self {
      store:      self.store.clone(),
      aggregator: self.aggregator.clone(),
      repository: self.repository.clone(),
      scoring:    self.scoring.clone(),
      events:     self.events.clone(),
    }
  }
}

impl<S: CandidateStore + 'static> LocalWorkflow<S> {
  pub fn new(
    store: Arc<S>,
    aggregator: Arc<SourceAggregator>,
    scoring: ScoringOrchestrator<S>,
    events: Arc<dyn EventSink>,
  ) -> Self {
    let repository = CandidateRepository::new(store.clone());
    Self { store, aggregator, repository, scoring, events }
  }

  /// Run a round to completion on the current task.
  pub async fn run(&self, request: WorkflowRequest) -> RoundReport {
    let search_id = request.search_id;
    let runs = request.strategy_ids.len();
    let mut report = RoundReport { runs, ..Default::default() };

    self.status(search_id, SearchStatus::Executing, SOURCING_START, "Sourcing candidates").await;

    for (i, strategy_id) in request.strategy_ids.iter().enumerate() {
      match self.run_strategy(&request, *strategy_id).await {
        Some(persisted) => {
          report.saved += persisted.saved;
          report.linked += persisted.linked;
        }
        None => report.failed_runs += 1,
      }
      let progress = SOURCING_START as usize
        + (i + 1) * (SOURCING_END - SOURCING_START) as usize / runs.max(1);
      self
        .status(
          search_id,
          SearchStatus::Executing,
          progress as u8,
          &format!("Ran strategy {} of {}", i + 1, runs),
        )
        .await;
    }

    self.status(search_id, SearchStatus::Polling, SCORING_START, "Scoring candidates").await;
    match self.scoring.score_batch(search_id, Vec::new()).await {
      Ok(batch) => report.scored = batch.scored,
      Err(e) => warn!(%search_id, error = %e, "batch scoring failed"),
    }

    report.final_total = match self.store.scoring_progress(search_id).await {
      Ok(progress) => progress.total,
      Err(e) => {
        warn!(%search_id, error = %e, "could not read final candidate count");
        report.linked as u64
      }
    };

    if report.final_total == 0 {
      self.status(search_id, SearchStatus::Failed, 100, "No candidates found").await;
    } else {
      let message = format!("Found {} new candidates", report.linked);
      self.status(search_id, SearchStatus::Completed, 100, &message).await;
    }

    info!(
      %search_id,
      runs = report.runs,
      failed_runs = report.failed_runs,
      saved = report.saved,
      linked = report.linked,
      scored = report.scored,
      "sourcing round finished"
    );
    report
  }

  /// Run one strategy. `None` means the run failed.
  async fn run_strategy(&self, request: &WorkflowRequest, strategy_id: Uuid) -> Option<PersistReport> {
    let search_id = request.search_id;
    let strategy = match self.store.start_strategy_run(strategy_id).await {
      Ok(strategy) => strategy,
      Err(e) => {
        warn!(%search_id, %strategy_id, error = %e, "could not start strategy run");
        return None;
      }
    };
    if strategy.search_id != search_id {
      warn!(%search_id, %strategy_id, "strategy belongs to another search; skipping");
      self.finish(strategy_id, StrategyStatus::Failed).await;
      return None;
    }

    let query = SourceQuery {
      criteria: request.criteria.clone(),
      params:   strategy.params,
      page:     strategy.run_count,
    };
    let records = self.aggregator.search_records(&query).await;

    match self.repository.persist(search_id, &records, &[strategy_id]).await {
      Ok(persisted) => {
        self.finish(strategy_id, StrategyStatus::Completed).await;
        Some(persisted)
      }
      Err(e) => {
        warn!(%search_id, %strategy_id, error = %e, "persisting strategy results failed");
        self.finish(strategy_id, StrategyStatus::Failed).await;
        None
      }
    }
  }

  async fn finish(&self, strategy_id: Uuid, status: StrategyStatus) {
    if let Err(e) = self.store.finish_strategy_run(strategy_id, status).await {
      warn!(%strategy_id, error = %e, "could not record strategy outcome");
    }
  }

  async fn status(&self, search_id: Uuid, status: SearchStatus, progress: u8, message: &str) {
    if let Err(e) = self.store.update_search_status(search_id, status, progress).await {
      error!(%search_id, %status, error = %e, "could not update search status");
    }
    self.events.publish(search_id, SearchEvent::StatusUpdated {
      status,
      message: message.to_owned(),
      progress,
    });
  }
}

#[async_trait]
impl<S: CandidateStore + 'static> WorkflowTrigger for LocalWorkflow<S> {
  async fn trigger(&self, request: WorkflowRequest) -> Result<(), TriggerError> {
    if request.strategy_ids.is_empty() {
      return Err(TriggerError("no strategies scheduled".into()));
    }
    let span = info_span!("sourcing_round", search_id = %request.search_id);
    let this = self.clone();
    tokio::spawn(async move { this.run(request).await }.instrument(span));
    Ok(())
  }
}
