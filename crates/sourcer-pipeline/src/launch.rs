//! Starting a new search: create it, create its strategies, trigger the first
//! sourcing round.

use std::sync::Arc;

use serde::Deserialize;
use sourcer_core::{
  access::AccessGuard,
  events::{EventSink, SearchEvent},
  search::{NewSearch, Search, SearchStatus, SourcingStrategy},
  store::CandidateStore,
  workflow::{WorkflowRequest, WorkflowTrigger},
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{LaunchError, store_err};

#[derive(Debug, Clone, Deserialize)]
pub struct LaunchRequest {
  pub organization_id: Uuid,
  pub query_text:      String,
  /// Structured criteria, already parsed upstream.
  pub criteria:        serde_json::Value,
  /// Parameters of each strategy to run. Empty means one strategy with no
  /// parameters of its own.
  #[serde(default)]
  pub strategies:      Vec<serde_json::Value>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Launched {
  pub search:     Search,
  pub strategies: Vec<SourcingStrategy>,
}

pub struct SearchLauncher<S> {
  store:   Arc<S>,
  guard:   Arc<dyn AccessGuard>,
  trigger: Arc<dyn WorkflowTrigger>,
  events:  Arc<dyn EventSink>,
}

impl<S> Clone for SearchLauncher<S> {
  fn clone(&self) -> Self {
    Self {
      store:   self.store.clone(),
      guard:   self.guard.clone(),
      trigger: self.trigger.clone(),
      events:  self.events.clone(),
    }
  }
}

impl<S: CandidateStore> SearchLauncher<S> {
  pub fn new(
    store: Arc<S>,
    guard: Arc<dyn AccessGuard>,
    trigger: Arc<dyn WorkflowTrigger>,
    events: Arc<dyn EventSink>,
  ) -> Self {
    Self { store, guard, trigger, events }
  }

  pub async fn launch(&self, request: LaunchRequest) -> Result<Launched, LaunchError> {
    let query_text = request.query_text.trim().to_owned();
    if query_text.is_empty() {
      return Err(LaunchError::Validation("query text is empty".into()));
    }
    if request.criteria.is_null() {
      return Err(LaunchError::Validation("criteria are missing".into()));
    }
    self.guard.assert_write_allowed(request.organization_id).await?;

    let mut search = self
      .store
      .create_search(NewSearch {
        organization_id: request.organization_id,
        query_text,
        criteria: request.criteria,
      })
      .await
      .map_err(|e| LaunchError::Store(store_err(e)))?;

    let params = if request.strategies.is_empty() {
      vec![serde_json::json!({})]
    } else {
      request.strategies
    };
    let mut strategies = Vec::with_capacity(params.len());
    for p in params {
      strategies.push(
        self
          .store
          .create_strategy(search.search_id, p)
          .await
          .map_err(|e| LaunchError::Store(store_err(e)))?,
      );
    }

    self.set_status(&mut search, SearchStatus::Processing, "Search started").await?;

    let trigger = self
      .trigger
      .trigger(WorkflowRequest {
        search_id:    search.search_id,
        query_text:   search.query_text.clone(),
        criteria:     search.criteria.clone(),
        strategy_ids: strategies.iter().map(|s| s.strategy_id).collect(),
      })
      .await;
    if let Err(e) = trigger {
      warn!(search_id = %search.search_id, error = %e, "could not start sourcing");
      self.set_status(&mut search, SearchStatus::Failed, &e.to_string()).await?;
      return Err(e.into());
    }

    info!(search_id = %search.search_id, strategies = strategies.len(), "search launched");
    Ok(Launched { search, strategies })
  }

  async fn set_status(
    &self,
    search: &mut Search,
    status: SearchStatus,
    message: &str,
  ) -> Result<(), LaunchError> {
    self
      .store
      .update_search_status(search.search_id, status, search.progress)
      .await
      .map_err(|e| LaunchError::Store(store_err(e)))?;
    search.status = status;
    self.events.publish(search.search_id, SearchEvent::StatusUpdated {
      status,
      message: message.to_owned(),
      progress: search.progress,
    });
    Ok(())
  }
}
