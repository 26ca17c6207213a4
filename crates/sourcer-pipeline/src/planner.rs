//! Continuation Planner: pick the strategies worth re-running and start a new
//! sourcing round for an existing search.

use std::sync::Arc;

use sourcer_core::{
  access::AccessGuard,
  events::{EventSink, SearchEvent},
  planning::{ContinuationPlan, PlannerConfig, plan_continuation},
  search::{Search, SearchStatus, StrategyStatus},
  store::CandidateStore,
  workflow::{WorkflowRequest, WorkflowTrigger},
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{PlannerError, store_err};

pub struct ContinuationPlanner<S> {
  store:   Arc<S>,
  guard:   Arc<dyn AccessGuard>,
  trigger: Arc<dyn WorkflowTrigger>,
  events:  Arc<dyn EventSink>,
  config:  PlannerConfig,
}

impl<S> Clone for ContinuationPlanner<S> {
  fn clone(&self) -> Self {
    Self {
      store:   self.store.clone(),
      guard:   self.guard.clone(),
      trigger: self.trigger.clone(),
      events:  self.events.clone(),
      config:  self.config.clone(),
    }
  }
}

impl<S: CandidateStore> ContinuationPlanner<S> {
  pub fn new(
    store: Arc<S>,
    guard: Arc<dyn AccessGuard>,
    trigger: Arc<dyn WorkflowTrigger>,
    events: Arc<dyn EventSink>,
    config: PlannerConfig,
  ) -> Self {
    Self { store, guard, trigger, events, config }
  }

  pub fn config(&self) -> &PlannerConfig { &self.config }

  /// Plan a continuation round for `search_id` and hand it to the workflow.
  ///
  /// The search moves to `processing` before planning starts. If anything
  /// after that fails, the search is put back to `completed`.
  pub async fn continue_search(&self, search_id: Uuid) -> Result<ContinuationPlan, PlannerError> {
    let search = self
      .store
      .get_search(search_id)
      .await
      .map_err(|e| PlannerError::Store(store_err(e)))?
      .ok_or(PlannerError::SearchNotFound(search_id))?;
    self.guard.assert_write_allowed(search.organization_id).await?;

    self.set_status(search_id, SearchStatus::Processing, 0, "Finding more candidates").await?;

    match self.plan_and_trigger(&search).await {
      Ok(plan) => {
        info!(
          %search_id,
          mode = ?plan.mode,
          strategies = plan.selected.len(),
          runs = plan.schedule.len(),
          "continuation triggered"
        );
        Ok(plan)
      }
      Err(e) => {
        warn!(%search_id, error = %e, "continuation failed; resetting search");
        if let Err(reset) = self
          .set_status(search_id, SearchStatus::Completed, 100, &format!("Could not continue: {e}"))
          .await
        {
          error!(%search_id, error = %reset, "could not reset search status");
        }
        Err(e)
      }
    }
  }

  async fn plan_and_trigger(&self, search: &Search) -> Result<ContinuationPlan, PlannerError> {
    let scores = self
      .store
      .strategy_scores(search.search_id)
      .await
      .map_err(|e| PlannerError::Store(store_err(e)))?;

    let completed: Vec<Uuid> = if scores.is_empty() {
      self
        .store
        .list_strategies(search.search_id)
        .await
        .map_err(|e| PlannerError::Store(store_err(e)))?
        .into_iter()
        .filter(|s| s.status == StrategyStatus::Completed)
        .map(|s| s.strategy_id)
        .collect()
    } else {
      Vec::new()
    };

    let plan =
      plan_continuation(&scores, &completed, &self.config).ok_or(PlannerError::NoStrategies)?;

    self
      .trigger
      .trigger(WorkflowRequest {
        search_id:    search.search_id,
        query_text:   search.query_text.clone(),
        criteria:     search.criteria.clone(),
        strategy_ids: plan.schedule.clone(),
      })
      .await?;
    Ok(plan)
  }

  async fn set_status(
    &self,
    search_id: Uuid,
    status: SearchStatus,
    progress: u8,
    message: &str,
  ) -> Result<(), PlannerError> {
    self
      .store
      .update_search_status(search_id, status, progress)
      .await
      .map_err(|e| PlannerError::Store(store_err(e)))?;
    self.events.publish(search_id, SearchEvent::StatusUpdated {
      status,
      message: message.to_owned(),
      progress,
    });
    Ok(())
  }
}
