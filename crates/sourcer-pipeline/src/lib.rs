//! The sourcing pipeline: aggregation, persistence, scoring, enrichment and
//! continuation, composed over any [`CandidateStore`].
//!
//! External capabilities are injected as trait objects; [`http`] carries the
//! `reqwest` implementations used in production.

pub mod aggregator;
pub mod enrichment;
pub mod error;
pub mod events;
pub mod http;
pub mod launch;
pub mod planner;
pub mod repository;
pub mod scoring;
pub mod workflow;

use std::sync::Arc;

use sourcer_core::{
  access::AccessGuard,
  enrichment::EnrichmentProvider,
  events::EventSink,
  planning::PlannerConfig,
  provider::ProfileProvider,
  scoring::ScoringService,
  store::CandidateStore,
  workflow::WorkflowTrigger,
};

pub use aggregator::{SourceAggregator, SourcedRecord};
pub use enrichment::{CandidateEnricher, EnrichmentConfig, EnrichmentMachine};
pub use events::EventBus;
pub use launch::{LaunchRequest, Launched, SearchLauncher};
pub use planner::ContinuationPlanner;
pub use repository::{CandidateRepository, PersistReport};
pub use scoring::{BatchReport, ScoredCandidate, ScoringOrchestrator};
pub use workflow::{LocalWorkflow, RoundReport};

/// The external capabilities a pipeline is assembled from.
pub struct Collaborators {
  pub providers:  Vec<Arc<dyn ProfileProvider>>,
  pub scorer:     Arc<dyn ScoringService>,
  pub enrichment: Arc<dyn EnrichmentProvider>,
  pub guard:      Arc<dyn AccessGuard>,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
  pub enrichment:     EnrichmentConfig,
  pub planner:        PlannerConfig,
  /// Per-search event buffer; `0` selects the default.
  pub event_capacity: usize,
}

/// Every pipeline component wired to one store and one event bus, with the
/// in-process [`LocalWorkflow`] as the sourcing trigger.
pub struct Pipeline<S> {
  pub store:      Arc<S>,
  pub events:     Arc<EventBus>,
  pub guard:      Arc<dyn AccessGuard>,
  pub aggregator: Arc<SourceAggregator>,
  pub repository: CandidateRepository<S>,
  pub scoring:    ScoringOrchestrator<S>,
  pub enricher:   CandidateEnricher<S>,
  pub planner:    ContinuationPlanner<S>,
  pub launcher:   SearchLauncher<S>,
}

impl<S: CandidateStore + 'static> Pipeline<S> {
  pub fn new(store: Arc<S>, collaborators: Collaborators, config: PipelineConfig) -> Self {
    let events = Arc::new(match config.event_capacity {
      0 => EventBus::default(),
      n => EventBus::new(n),
    });
    let sink: Arc<dyn EventSink> = events.clone();
    let guard = collaborators.guard;

    let aggregator = Arc::new(SourceAggregator::new(collaborators.providers));
    let scoring =
      ScoringOrchestrator::new(store.clone(), collaborators.scorer, guard.clone(), sink.clone());
    let trigger: Arc<dyn WorkflowTrigger> = Arc::new(LocalWorkflow::new(
      store.clone(),
      aggregator.clone(),
      scoring.clone(),
      sink.clone(),
    ));

    Self {
      repository: CandidateRepository::new(store.clone()),
      enricher: CandidateEnricher::new(
        store.clone(),
        guard.clone(),
        EnrichmentMachine::new(collaborators.enrichment, config.enrichment),
      ),
      planner: ContinuationPlanner::new(
        store.clone(),
        guard.clone(),
        trigger.clone(),
        sink.clone(),
        config.planner,
      ),
      launcher: SearchLauncher::new(store.clone(), guard.clone(), trigger, sink),
      store,
      events,
      guard,
      aggregator,
      scoring,
    }
  }
}

#[cfg(test)]
mod tests;
