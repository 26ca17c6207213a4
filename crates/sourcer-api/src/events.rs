//! `GET /searches/:id/events`: the per-search event bus as Server-Sent Events.

use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
  extract::{Path, State},
  response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use sourcer_core::{events::SearchEvent, store::CandidateStore};
use sourcer_pipeline::Pipeline;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{error::ApiError, readable_search};

const KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Event name in `event:`, the payload alone in `data:`. Events that fail to
/// serialise are dropped.
pub fn to_sse(event: &SearchEvent) -> Option<Event> {
  let payload = match serde_json::to_value(event) {
    Ok(mut v) => v["data"].take(),
    Err(e) => {
      warn!(error = %e, "could not encode event");
      return None;
    }
  };
  match Event::default().event(event.name()).json_data(payload) {
    Ok(e) => Some(e),
    Err(e) => {
      warn!(error = %e, "could not encode event");
      None
    }
  }
}

pub async fn stream<S>(
  State(pipeline): State<Arc<Pipeline<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError>
where
  S: CandidateStore + 'static,
{
  readable_search(&pipeline, id).await?;

  let events = pipeline.events.subscribe_stream(id);
  info!(search_id = %id, subscribers = pipeline.events.subscriber_count(id), "event stream opened");

  let stream = events.filter_map(|event| async move { to_sse(&event).map(Ok) });
  Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE).text("keep-alive")))
}
