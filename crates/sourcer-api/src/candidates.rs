//! Handlers for candidate listings, search-candidate links and enrichment.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/searches/:id/candidates` | Optional `score_min`, `score_max`, `sort`, `limit`, `offset`, `cursor` |
//! | `GET`   | `/search-candidates/:id` | Single link |
//! | `PATCH` | `/search-candidates/:id` | Body: `{"status":"reviewing","notes":"..."}` |
//! | `POST`  | `/search-candidates/:id/score` | Score one link now |
//! | `GET`   | `/search-candidates/:id/candidate` | Shared candidate record behind the link |
//! | `POST`  | `/search-candidates/:id/enrich` | Body: [`EnrichBody`]; returns the enrichment outcome |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;
use sourcer_core::{
  candidate::{Candidate, SearchCandidate, SearchCandidatePatch},
  enrichment::{ContactRequest, EnrichmentOutcome},
  store::{CandidatePage, CandidateQuery, CandidateStore, SortKey},
};
use sourcer_pipeline::{Pipeline, ScoredCandidate};
use uuid::Uuid;

use crate::{error::ApiError, readable_search};

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  /// Setting either bound excludes unscored candidates.
  pub score_min: Option<f64>,
  pub score_max: Option<f64>,
  /// `date-asc`, `date-desc` (default), `score-asc` or `score-desc`.
  pub sort:      Option<SortKey>,
  pub limit:     Option<usize>,
  pub offset:    Option<usize>,
  /// `next_cursor` of the previous page.
  pub cursor:    Option<String>,
}

/// `GET /searches/:id/candidates[?score_min=..][&score_max=..][&sort=..][&limit=..][&offset=..][&cursor=..]`
pub async fn list<S>(
  State(pipeline): State<Arc<Pipeline<S>>>,
  Path(id): Path<Uuid>,
  Query(params): Query<ListParams>,
) -> Result<Json<CandidatePage>, ApiError>
where
  S: CandidateStore + 'static,
{
  if let (Some(min), Some(max)) = (params.score_min, params.score_max) {
    if min > max {
      return Err(ApiError::BadRequest(format!("score_min {min} is above score_max {max}")));
    }
  }
  readable_search(&pipeline, id).await?;

  let query = CandidateQuery {
    search_id: id,
    score_min: params.score_min,
    score_max: params.score_max,
    sort:      params.sort.unwrap_or_default(),
    limit:     params.limit,
    offset:    params.offset,
    cursor:    params.cursor,
  };
  let page = pipeline.store.list_candidates(&query).await.map_err(ApiError::store)?;
  Ok(Json(page))
}

// ─── Search-candidate links ──────────────────────────────────────────────────

async fn readable_link<S: CandidateStore>(
  pipeline: &Pipeline<S>,
  id: Uuid,
) -> Result<SearchCandidate, ApiError> {
  let link = pipeline
    .store
    .get_search_candidate(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("search candidate {id} not found")))?;
  pipeline.guard.assert_read_access(link.search_id).await?;
  Ok(link)
}

/// `GET /search-candidates/:id`
pub async fn get_link<S>(
  State(pipeline): State<Arc<Pipeline<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<SearchCandidate>, ApiError>
where
  S: CandidateStore + 'static,
{
  Ok(Json(readable_link(&pipeline, id).await?))
}

/// `PATCH /search-candidates/:id`
pub async fn update_link<S>(
  State(pipeline): State<Arc<Pipeline<S>>>,
  Path(id): Path<Uuid>,
  Json(patch): Json<SearchCandidatePatch>,
) -> Result<Json<SearchCandidate>, ApiError>
where
  S: CandidateStore + 'static,
{
  readable_link(&pipeline, id).await?;
  let link = pipeline
    .store
    .update_search_candidate(id, patch)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(link))
}

/// `POST /search-candidates/:id/score`
pub async fn score_one<S>(
  State(pipeline): State<Arc<Pipeline<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ScoredCandidate>, ApiError>
where
  S: CandidateStore + 'static,
{
  Ok(Json(pipeline.scoring.score_one(id).await?))
}

// ─── Candidates ──────────────────────────────────────────────────────────────

/// `GET /search-candidates/:id/candidate`
pub async fn get_candidate<S>(
  State(pipeline): State<Arc<Pipeline<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Candidate>, ApiError>
where
  S: CandidateStore + 'static,
{
  let link = readable_link(&pipeline, id).await?;
  let candidate = pipeline
    .store
    .get_candidate(link.candidate_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("candidate {} not found", link.candidate_id)))?;
  Ok(Json(candidate))
}

/// JSON body accepted by `POST /search-candidates/:id/enrich`.
///
/// `contacts` wins when present; otherwise the include flags decide, and no
/// flags at all means email only.
#[derive(Debug, Default, Deserialize)]
pub struct EnrichBody {
  pub contacts:      Option<ContactRequest>,
  pub include_email: Option<bool>,
  pub include_phone: Option<bool>,
}

impl EnrichBody {
  pub fn request(&self) -> ContactRequest {
    self
      .contacts
      .unwrap_or_else(|| ContactRequest::from_flags(self.include_email, self.include_phone))
  }
}

/// `POST /search-candidates/:id/enrich`
///
/// Answers with one of the enrichment outcomes once access is granted; an
/// unknown link, a denied search or a store failure is an HTTP error.
pub async fn enrich<S>(
  State(pipeline): State<Arc<Pipeline<S>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<EnrichBody>,
) -> Result<Json<EnrichmentOutcome>, ApiError>
where
  S: CandidateStore + 'static,
{
  let outcome = pipeline.enricher.enrich(id, body.request()).await?;
  Ok(Json(outcome))
}
