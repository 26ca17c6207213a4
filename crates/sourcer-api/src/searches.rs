//! Handlers for `/searches` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/searches` | Body: [`LaunchRequest`]; returns 201 + search and strategies |
//! | `GET`  | `/searches/:id` | 404 if not found |
//! | `GET`  | `/searches/:id/progress` | `{total, scored, unscored, isScoringComplete}` |
//! | `GET`  | `/searches/:id/strategies` | Oldest first |
//! | `POST` | `/searches/:id/score` | Body: `{"ids":[...]}`; empty scores every unscored link |
//! | `POST` | `/searches/:id/continue` | Returns 202 + the continuation plan |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use sourcer_core::{
  planning::ContinuationPlan,
  search::{Search, SourcingStrategy},
  store::{CandidateStore, ScoringProgress},
};
use sourcer_pipeline::{BatchReport, LaunchRequest, Pipeline};
use uuid::Uuid;

use crate::{error::ApiError, readable_search};

// ─── Launch ──────────────────────────────────────────────────────────────────

/// `POST /searches`
pub async fn launch<S>(
  State(pipeline): State<Arc<Pipeline<S>>>,
  Json(body): Json<LaunchRequest>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CandidateStore + 'static,
{
  let launched = pipeline.launcher.launch(body).await?;
  Ok((StatusCode::CREATED, Json(launched)))
}

// ─── Reads ───────────────────────────────────────────────────────────────────

/// `GET /searches/:id`
pub async fn get_one<S>(
  State(pipeline): State<Arc<Pipeline<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Search>, ApiError>
where
  S: CandidateStore + 'static,
{
  Ok(Json(readable_search(&pipeline, id).await?))
}

/// `GET /searches/:id/progress`
pub async fn progress<S>(
  State(pipeline): State<Arc<Pipeline<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ScoringProgress>, ApiError>
where
  S: CandidateStore + 'static,
{
  readable_search(&pipeline, id).await?;
  let progress = pipeline.store.scoring_progress(id).await.map_err(ApiError::store)?;
  Ok(Json(progress))
}

/// `GET /searches/:id/strategies`
pub async fn strategies<S>(
  State(pipeline): State<Arc<Pipeline<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<SourcingStrategy>>, ApiError>
where
  S: CandidateStore + 'static,
{
  readable_search(&pipeline, id).await?;
  let strategies = pipeline.store.list_strategies(id).await.map_err(ApiError::store)?;
  Ok(Json(strategies))
}

// ─── Batch scoring ───────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ScoreBatchBody {
  /// Search-candidate ids to score. Empty means every unscored link.
  #[serde(default)]
  pub ids: Vec<Uuid>,
}

/// `POST /searches/:id/score`
pub async fn score_batch<S>(
  State(pipeline): State<Arc<Pipeline<S>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ScoreBatchBody>,
) -> Result<Json<BatchReport>, ApiError>
where
  S: CandidateStore + 'static,
{
  let report = pipeline.scoring.score_batch(id, body.ids).await?;
  Ok(Json(report))
}

// ─── Continuation ────────────────────────────────────────────────────────────

/// `POST /searches/:id/continue`
///
/// The runs themselves happen in the background; progress arrives on the
/// event stream.
pub async fn continue_search<S>(
  State(pipeline): State<Arc<Pipeline<S>>>,
  Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ContinuationPlan>), ApiError>
where
  S: CandidateStore + 'static,
{
  let plan = pipeline.planner.continue_search(id).await?;
  Ok((StatusCode::ACCEPTED, Json(plan)))
}
