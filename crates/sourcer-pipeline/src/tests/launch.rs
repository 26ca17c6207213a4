use std::sync::Arc;

use serde_json::json;
use sourcer_core::{access::AllowAll, search::SearchStatus, store::CandidateStore};
use sourcer_store_sqlite::SqliteStore;
use uuid::Uuid;

use super::{
  fakes::{DenyAll, RecordingSink, RecordingTrigger},
  store,
};
use crate::{LaunchRequest, SearchLauncher, error::LaunchError};

fn launcher(
  store: &Arc<SqliteStore>,
  trigger: &Arc<RecordingTrigger>,
  sink: &Arc<RecordingSink>,
) -> SearchLauncher<SqliteStore> {
  SearchLauncher::new(store.clone(), Arc::new(AllowAll), trigger.clone(), sink.clone())
}

fn request(strategies: Vec<serde_json::Value>) -> LaunchRequest {
  LaunchRequest {
    organization_id: Uuid::new_v4(),
    query_text: "  staff rust engineer, remote  ".into(),
    criteria: json!({ "skills": ["rust"], "remote": true }),
    strategies,
  }
}

#[tokio::test]
async fn launch_creates_default_strategy_and_triggers() {
  let store = store().await;
  let trigger = Arc::new(RecordingTrigger::default());
  let sink = Arc::new(RecordingSink::default());

  let launched = launcher(&store, &trigger, &sink).launch(request(vec![])).await.unwrap();
  assert_eq!(launched.search.status, SearchStatus::Processing);
  assert_eq!(launched.search.query_text, "staff rust engineer, remote");
  assert_eq!(launched.strategies.len(), 1);

  let stored = store.get_search(launched.search.search_id).await.unwrap().unwrap();
  assert_eq!(stored.status, SearchStatus::Processing);
  assert_eq!(trigger.schedules(), vec![vec![launched.strategies[0].strategy_id]]);
  assert_eq!(sink.names(), vec!["status.updated"]);
}

#[tokio::test]
async fn every_given_strategy_is_scheduled_in_order() {
  let store = store().await;
  let trigger = Arc::new(RecordingTrigger::default());
  let sink = Arc::new(RecordingSink::default());

  let launched = launcher(&store, &trigger, &sink)
    .launch(request(vec![json!({ "title": "rust" }), json!({ "title": "systems" })]))
    .await
    .unwrap();
  let ids: Vec<Uuid> = launched.strategies.iter().map(|s| s.strategy_id).collect();
  assert_eq!(trigger.schedules(), vec![ids.clone()]);

  let listed = store.list_strategies(launched.search.search_id).await.unwrap();
  assert_eq!(listed.iter().map(|s| s.strategy_id).collect::<Vec<_>>(), ids);
}

#[tokio::test]
async fn blank_query_is_rejected() {
  let store = store().await;
  let trigger = Arc::new(RecordingTrigger::default());
  let sink = Arc::new(RecordingSink::default());

  let mut req = request(vec![]);
  req.query_text = "   ".into();
  let err = launcher(&store, &trigger, &sink).launch(req).await.unwrap_err();
  assert!(matches!(err, LaunchError::Validation(_)));
  assert!(trigger.schedules().is_empty());
}

#[tokio::test]
async fn denied_organization_creates_nothing() {
  let store = store().await;
  let trigger = Arc::new(RecordingTrigger::default());
  let sink = Arc::new(RecordingSink::default());
  let denied = SearchLauncher::new(store.clone(), Arc::new(DenyAll), trigger.clone(), sink.clone());

  let err = denied.launch(request(vec![])).await.unwrap_err();
  assert!(matches!(err, LaunchError::Forbidden(_)));
  assert!(sink.names().is_empty());
}

#[tokio::test]
async fn trigger_failure_marks_search_failed() {
  let store = store().await;
  let trigger = RecordingTrigger::failing();
  let sink = Arc::new(RecordingSink::default());

  let err = launcher(&store, &trigger, &sink).launch(request(vec![])).await.unwrap_err();
  assert!(matches!(err, LaunchError::Trigger(_)));
  assert!(matches!(
    sink.last(),
    Some(sourcer_core::events::SearchEvent::StatusUpdated { status: SearchStatus::Failed, .. })
  ));
}
