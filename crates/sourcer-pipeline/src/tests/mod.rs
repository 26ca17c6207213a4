//! Pipeline tests against an in-memory `SqliteStore` and fake collaborators.

mod enrichment;
mod launch;
mod repository;

use std::sync::Arc;

use serde_json::json;
use sourcer_core::{search::NewSearch, store::CandidateStore};
use sourcer_store_sqlite::SqliteStore;
use uuid::Uuid;

async fn store() -> Arc<SqliteStore> {
  Arc::new(SqliteStore::open_in_memory().await.expect("in-memory store"))
}

async fn search_with_criteria(store: &SqliteStore, criteria: serde_json::Value) -> Uuid {
  store
    .create_search(NewSearch {
      organization_id: Uuid::new_v4(),
      query_text: "senior rust engineer, berlin".into(),
      criteria,
    })
    .await
    .unwrap()
    .search_id
}

async fn search(store: &SqliteStore) -> Uuid {
  search_with_criteria(store, json!({ "skills": ["rust"], "location": "Berlin" })).await
}
