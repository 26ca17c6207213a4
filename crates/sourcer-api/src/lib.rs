//! JSON REST API for the sourcing pipeline.
//!
//! Exposes an axum [`Router`] backed by a [`Pipeline`] over any
//! [`sourcer_core::store::CandidateStore`]. Authentication and TLS are the
//! caller's responsibility; authorisation goes through the pipeline's
//! access guard.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", sourcer_api::api_router(pipeline.clone()))
//! ```

pub mod candidates;
pub mod error;
pub mod events;
pub mod searches;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use sourcer_core::store::CandidateStore;
use sourcer_pipeline::Pipeline;
use uuid::Uuid;

pub use error::ApiError;

/// Build a fully-materialised API router for `pipeline`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(pipeline: Arc<Pipeline<S>>) -> Router<()>
where
  S: CandidateStore + 'static,
{
  Router::new()
    // Searches
    .route("/searches", post(searches::launch::<S>))
    .route("/searches/{id}", get(searches::get_one::<S>))
    .route("/searches/{id}/progress", get(searches::progress::<S>))
    .route("/searches/{id}/strategies", get(searches::strategies::<S>))
    .route("/searches/{id}/score", post(searches::score_batch::<S>))
    .route("/searches/{id}/continue", post(searches::continue_search::<S>))
    .route("/searches/{id}/events", get(events::stream::<S>))
    // Candidates
    .route("/searches/{id}/candidates", get(candidates::list::<S>))
    .route(
      "/search-candidates/{id}",
      get(candidates::get_link::<S>).patch(candidates::update_link::<S>),
    )
    .route("/search-candidates/{id}/score", post(candidates::score_one::<S>))
    .route("/search-candidates/{id}/candidate", get(candidates::get_candidate::<S>))
    .route("/search-candidates/{id}/enrich", post(candidates::enrich::<S>))
    .with_state(pipeline)
}

/// Load a search and check read access to it.
pub(crate) async fn readable_search<S: CandidateStore>(
  pipeline: &Pipeline<S>,
  id: Uuid,
) -> Result<sourcer_core::search::Search, ApiError> {
  let search = pipeline
    .store
    .get_search(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("search {id} not found")))?;
  pipeline.guard.assert_read_access(id).await?;
  Ok(search)
}
