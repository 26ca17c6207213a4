//! Continuation planning: deciding which strategies to re-run to grow a search.
//!
//! Strategies are ranked by the median score of the candidates they found.
//! The best are kept under a relaxing threshold and cycled round-robin until
//! the schedule is long enough to reach the candidate target.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlannerConfig {
  /// How many more candidates one continuation should aim to add.
  pub target_candidates:  u32,
  /// Expected yield of one strategy run.
  pub candidates_per_run: u32,
  /// Cap on distinct strategies per continuation.
  pub max_strategies:     usize,
  /// Median thresholds, tried in order until one admits a strategy.
  pub thresholds:         Vec<f64>,
}

impl Default for PlannerConfig {
  fn default() -> Self {
    Self {
      target_candidates:  150,
      candidates_per_run: 25,
      max_strategies:     6,
      thresholds:         vec![50.0, 30.0],
    }
  }
}

impl PlannerConfig {
  /// `ceil(target / per_run)`; at least one run.
  pub fn runs_needed(&self) -> usize {
    let per_run = self.candidates_per_run.max(1);
    (self.target_candidates.div_ceil(per_run) as usize).max(1)
  }
}

// ─── Median ──────────────────────────────────────────────────────────────────

/// Median of `scores`; even counts average the two middle values.
pub fn median(scores: &[f64]) -> Option<f64> {
  if scores.is_empty() {
    return None;
  }
  let mut sorted = scores.to_vec();
  sorted.sort_by(f64::total_cmp);
  let mid = sorted.len() / 2;
  if sorted.len() % 2 == 0 {
    Some((sorted[mid - 1] + sorted[mid]) / 2.0)
  } else {
    Some(sorted[mid])
  }
}

/// Score performance of one strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyMedian {
  pub strategy_id: Uuid,
  pub median:      f64,
  pub samples:     usize,
}

/// Group `(strategy_id, score)` pairs and rank strategies by descending
/// median. Ties go to the strategy with more samples, then to the lower id.
pub fn strategy_medians(scores: &[(Uuid, f64)]) -> Vec<StrategyMedian> {
  let mut grouped: HashMap<Uuid, Vec<f64>> = HashMap::new();
  for (strategy_id, score) in scores {
    grouped.entry(*strategy_id).or_default().push(*score);
  }

  let mut medians: Vec<StrategyMedian> = grouped
    .into_iter()
    .filter_map(|(strategy_id, scores)| {
      median(&scores).map(|median| StrategyMedian { strategy_id, median, samples: scores.len() })
    })
    .collect();

  medians.sort_by(|a, b| {
    b.median
      .total_cmp(&a.median)
      .then_with(|| b.samples.cmp(&a.samples))
      .then_with(|| a.strategy_id.cmp(&b.strategy_id))
  });
  medians
}

/// Pick the strategies worth re-running from a ranked list.
///
/// The first threshold that admits at least one strategy wins; when none
/// does, only the single best strategy is kept. The result is capped at
/// `max_strategies`.
pub fn select_strategies(ranked: &[StrategyMedian], config: &PlannerConfig) -> Vec<Uuid> {
  let mut selected: Vec<Uuid> = config
    .thresholds
    .iter()
    .map(|threshold| {
      ranked
        .iter()
        .filter(|m| m.median >= *threshold)
        .map(|m| m.strategy_id)
        .collect::<Vec<_>>()
    })
    .find(|admitted| !admitted.is_empty())
    .unwrap_or_else(|| ranked.iter().take(1).map(|m| m.strategy_id).collect());

  selected.truncate(config.max_strategies);
  selected
}

/// Cycle `selected` until the schedule holds `runs` entries.
pub fn round_robin(selected: &[Uuid], runs: usize) -> Vec<Uuid> {
  selected.iter().copied().cycle().take(runs).collect()
}

// ─── Plan ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanMode {
  /// Ranked by median score.
  Performance,
  /// Nothing was scored yet; re-run every completed strategy.
  Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContinuationPlan {
  pub mode:     PlanMode,
  /// Ranking the selection was drawn from; empty in fallback mode.
  pub ranking:  Vec<StrategyMedian>,
  pub selected: Vec<Uuid>,
  /// Ordered strategy runs, with repeats.
  pub schedule: Vec<Uuid>,
}

/// Build the continuation plan for a search.
///
/// `scores` holds one `(strategy_id, score)` pair per scored attribution;
/// `completed` the ids of strategies that completed successfully, in run
/// order. Returns `None` when there is nothing to schedule.
pub fn plan_continuation(
  scores: &[(Uuid, f64)],
  completed: &[Uuid],
  config: &PlannerConfig,
) -> Option<ContinuationPlan> {
  let runs = config.runs_needed();

  let plan = if scores.is_empty() {
    ContinuationPlan {
      mode:     PlanMode::Fallback,
      ranking:  Vec::new(),
      selected: completed.to_vec(),
      schedule: round_robin(completed, runs),
    }
  } else {
    let ranking = strategy_medians(scores);
    let selected = select_strategies(&ranking, config);
    let schedule = round_robin(&selected, runs);
    ContinuationPlan { mode: PlanMode::Performance, ranking, selected, schedule }
  };

  if plan.schedule.is_empty() { None } else { Some(plan) }
}
