//! The `CandidateStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `sourcer-store-sqlite`).
//! The pipeline and API crates depend on this abstraction, not on any concrete
//! backend.

use std::{
  collections::{HashMap, HashSet},
  future::Future,
  str::FromStr,
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error,
  candidate::{Candidate, ListedCandidate, NewCandidate, SearchCandidate, SearchCandidatePatch},
  search::{NewSearch, Search, SearchStatus, SourcingStrategy, StrategyStatus},
};

// ─── Listing ─────────────────────────────────────────────────────────────────

/// Sort order for candidate listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortKey {
  #[serde(rename = "date-asc")]
  DateAsc,
  #[default]
  #[serde(rename = "date-desc")]
  DateDesc,
  #[serde(rename = "score-asc")]
  ScoreAsc,
  #[serde(rename = "score-desc")]
  ScoreDesc,
}

impl FromStr for SortKey {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "date-asc" => Ok(Self::DateAsc),
      "date-desc" => Ok(Self::DateDesc),
      "score-asc" => Ok(Self::ScoreAsc),
      "score-desc" => Ok(Self::ScoreDesc),
      other => Err(Error::UnknownSortKey(other.to_owned())),
    }
  }
}

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 200;
/// Largest offset a backend can address; larger requests are clamped to it.
pub const MAX_OFFSET: usize = i64::MAX as usize;

/// Parameters for [`CandidateStore::list_candidates`].
#[derive(Debug, Clone, Default)]
pub struct CandidateQuery {
  pub search_id: Uuid,
  /// When neither bound is set, unscored candidates are included. When either
  /// is set, only scored candidates inside the range are returned.
  pub score_min: Option<f64>,
  pub score_max: Option<f64>,
  pub sort:      SortKey,
  pub limit:     Option<usize>,
  pub offset:    Option<usize>,
  /// Opaque cursor from a previous page; takes precedence over `offset`.
  pub cursor:    Option<String>,
}

impl CandidateQuery {
  pub fn page_size(&self) -> usize {
    self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
  }

  /// Starting offset, at most [`MAX_OFFSET`]. An unreadable cursor restarts
  /// from the beginning.
  pub fn start(&self) -> usize {
    match &self.cursor {
      Some(c) => decode_cursor(c).unwrap_or(0),
      None => self.offset.unwrap_or(0).min(MAX_OFFSET),
    }
  }

  pub fn is_score_filtered(&self) -> bool { self.score_min.is_some() || self.score_max.is_some() }
}

pub fn encode_cursor(offset: usize) -> String { format!("o{offset}") }

pub fn decode_cursor(cursor: &str) -> Option<usize> {
  cursor.strip_prefix('o')?.parse::<usize>().ok().map(|o| o.min(MAX_OFFSET))
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidatePage {
  pub items:       Vec<ListedCandidate>,
  /// Rows matching the filter, across all pages.
  pub total:       u64,
  pub next_cursor: Option<String>,
}

// ─── Progress ────────────────────────────────────────────────────────────────

/// Derived scoring progress; never stored as a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringProgress {
  pub total:               u64,
  pub scored:              u64,
  pub unscored:            u64,
  pub is_scoring_complete: bool,
}

impl ScoringProgress {
  pub fn new(total: u64, scored: u64) -> Self {
    let scored = scored.min(total);
    let unscored = total - scored;
    Self { total, scored, unscored, is_scoring_complete: total > 0 && unscored == 0 }
  }
}

// ─── Link inputs ─────────────────────────────────────────────────────────────

/// A search↔candidate link to create.
#[derive(Debug, Clone)]
pub struct NewLink {
  pub candidate_id: Uuid,
  pub source:       String,
}

/// A (search candidate, strategy) attribution to record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Attribution {
  pub search_candidate_id: Uuid,
  pub strategy_id:         Uuid,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a candidate store backend.
///
/// Searches own strategies; candidates are shared across searches through
/// `SearchCandidate` links; attributions join links to strategies. Every
/// entity is addressed by an opaque id.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait CandidateStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Searches ──────────────────────────────────────────────────────────

  fn create_search(
    &self,
    input: NewSearch,
  ) -> impl Future<Output = Result<Search, Self::Error>> + Send + '_;

  fn get_search(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Search>, Self::Error>> + Send + '_;

  /// Set status and progress (clamped to 100). Errors if the search is
  /// unknown.
  fn update_search_status(
    &self,
    id: Uuid,
    status: SearchStatus,
    progress: u8,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Strategies ────────────────────────────────────────────────────────

  fn create_strategy(
    &self,
    search_id: Uuid,
    params: serde_json::Value,
  ) -> impl Future<Output = Result<SourcingStrategy, Self::Error>> + Send + '_;

  fn get_strategy(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<SourcingStrategy>, Self::Error>> + Send + '_;

  /// All strategies of a search, oldest first.
  fn list_strategies(
    &self,
    search_id: Uuid,
  ) -> impl Future<Output = Result<Vec<SourcingStrategy>, Self::Error>> + Send + '_;

  /// Mark a strategy `running` and bump its run count. Returns the strategy as
  /// it was *before* the bump, so `run_count` is the page of this run.
  fn start_strategy_run(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<SourcingStrategy, Self::Error>> + Send + '_;

  fn finish_strategy_run(
    &self,
    id: Uuid,
    status: StrategyStatus,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The subset of `ids` that exist.
  fn existing_strategy_ids(
    &self,
    ids: Vec<Uuid>,
  ) -> impl Future<Output = Result<HashSet<Uuid>, Self::Error>> + Send + '_;

  /// One `(strategy_id, match_score)` pair per attribution of a scored
  /// candidate in the search.
  fn strategy_scores(
    &self,
    search_id: Uuid,
  ) -> impl Future<Output = Result<Vec<(Uuid, f64)>, Self::Error>> + Send + '_;

  // ── Candidates ────────────────────────────────────────────────────────

  /// Resolve already-known candidates for a batch of canonical URLs in one
  /// query. Unknown URLs are absent from the map.
  fn find_candidates_by_url(
    &self,
    urls: Vec<String>,
  ) -> impl Future<Output = Result<HashMap<String, Uuid>, Self::Error>> + Send + '_;

  /// Insert all candidates in a single write.
  fn insert_candidates(
    &self,
    candidates: Vec<NewCandidate>,
  ) -> impl Future<Output = Result<Vec<Candidate>, Self::Error>> + Send + '_;

  /// Overwrite every profile field of one candidate.
  fn update_candidate(
    &self,
    id: Uuid,
    candidate: NewCandidate,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_candidate(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Candidate>, Self::Error>> + Send + '_;

  /// Replace revealed contact details; `None` leaves that kind untouched.
  fn set_candidate_contacts(
    &self,
    id: Uuid,
    emails: Option<Vec<String>>,
    phones: Option<Vec<String>>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Links ─────────────────────────────────────────────────────────────

  /// Existing links of `search_id` among `candidate_ids`, keyed by candidate
  /// id, in one query.
  fn find_links(
    &self,
    search_id: Uuid,
    candidate_ids: Vec<Uuid>,
  ) -> impl Future<Output = Result<HashMap<Uuid, Uuid>, Self::Error>> + Send + '_;

  /// Insert links in a single write.
  fn insert_links(
    &self,
    search_id: Uuid,
    links: Vec<NewLink>,
  ) -> impl Future<Output = Result<Vec<SearchCandidate>, Self::Error>> + Send + '_;

  /// Insert attributions, ignoring pairs that already exist. Returns the
  /// number of new rows.
  fn insert_attributions(
    &self,
    attributions: Vec<Attribution>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  fn get_search_candidate(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<SearchCandidate>, Self::Error>> + Send + '_;

  fn update_search_candidate(
    &self,
    id: Uuid,
    patch: SearchCandidatePatch,
  ) -> impl Future<Output = Result<SearchCandidate, Self::Error>> + Send + '_;

  fn record_score(
    &self,
    id: Uuid,
    score: f64,
    notes: serde_json::Value,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn unscored_search_candidate_ids(
    &self,
    search_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  fn scoring_progress(
    &self,
    search_id: Uuid,
  ) -> impl Future<Output = Result<ScoringProgress, Self::Error>> + Send + '_;

  fn list_candidates<'a>(
    &'a self,
    query: &'a CandidateQuery,
  ) -> impl Future<Output = Result<CandidatePage, Self::Error>> + Send + 'a;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn progress_is_derived_and_bounded() {
    let p = ScoringProgress::new(10, 4);
    assert_eq!((p.scored, p.unscored), (4, 6));
    assert!(!p.is_scoring_complete);

    let p = ScoringProgress::new(3, 7);
    assert_eq!((p.scored, p.unscored), (3, 0));
    assert!(p.is_scoring_complete);

    assert!(!ScoringProgress::new(0, 0).is_scoring_complete);
  }

  #[test]
  fn cursor_roundtrip_and_fallback() {
    let q = CandidateQuery { cursor: Some(encode_cursor(120)), offset: Some(5), ..Default::default() };
    assert_eq!(q.start(), 120);

    let q = CandidateQuery { cursor: Some("garbage".into()), ..Default::default() };
    assert_eq!(q.start(), 0);
  }

  #[test]
  fn huge_offsets_are_clamped() {
    let q = CandidateQuery { offset: Some(usize::MAX), ..Default::default() };
    assert_eq!(q.start(), MAX_OFFSET);

    let q = CandidateQuery { cursor: Some(format!("o{}", u64::MAX)), ..Default::default() };
    assert!(q.start() <= MAX_OFFSET);
    assert!(i64::try_from(q.start()).is_ok());
  }

  #[test]
  fn page_size_is_clamped() {
    assert_eq!(CandidateQuery::default().page_size(), DEFAULT_PAGE_SIZE);
    let q = CandidateQuery { limit: Some(10_000), ..Default::default() };
    assert_eq!(q.page_size(), MAX_PAGE_SIZE);
  }

  #[test]
  fn sort_keys_parse() {
    assert_eq!("score-desc".parse::<SortKey>().unwrap(), SortKey::ScoreDesc);
    assert!("newest".parse::<SortKey>().is_err());
  }
}
