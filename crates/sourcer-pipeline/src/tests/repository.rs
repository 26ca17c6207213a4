use serde_json::json;
use sourcer_core::store::{Attribution, CandidateQuery, CandidateStore};
use uuid::Uuid;

use super::{
  fakes::{FlakyStore, record},
  search, store,
};
use crate::{CandidateRepository, SourcedRecord};

fn sourced(url: &str, name: &str) -> SourcedRecord {
  SourcedRecord { source: "directory".into(), record: record(url, name) }
}

#[tokio::test]
async fn overlapping_batch_creates_one_row_per_url() {
  let store = store().await;
  let search_id = search(&store).await;
  let repo = CandidateRepository::new(store.clone());

  let batch = vec![
    sourced("https://www.linkedin.com/in/ada", "Ada"),
    sourced("https://www.linkedin.com/in/ada/", "Ada Lovelace"),
    sourced("linkedin.com/in/grace", "Grace"),
    sourced("", "Nobody"),
  ];
  let report = repo.persist(search_id, &batch, &[]).await.unwrap();
  assert_eq!(report.saved, 2);
  assert_eq!(report.linked, 2);
  assert_eq!(report.dropped, 1);

  let found = store
    .find_candidates_by_url(vec!["https://www.linkedin.com/in/ada".into()])
    .await
    .unwrap();
  let ada = store.get_candidate(found["https://www.linkedin.com/in/ada"]).await.unwrap().unwrap();
  assert_eq!(ada.full_name.as_deref(), Some("Ada Lovelace"));
}

#[tokio::test]
async fn rediscovery_updates_without_relinking() {
  let store = store().await;
  let search_id = search(&store).await;
  let repo = CandidateRepository::new(store.clone());

  repo.persist(search_id, &[sourced("https://www.linkedin.com/in/ada", "Ada")], &[]).await.unwrap();
  let again = repo
    .persist(search_id, &[sourced("https://www.linkedin.com/in/ada", "Ada King")], &[])
    .await
    .unwrap();
  assert_eq!((again.saved, again.updated, again.linked), (0, 1, 0));

  let page = store
    .list_candidates(&CandidateQuery { search_id, ..Default::default() })
    .await
    .unwrap();
  assert_eq!(page.total, 1);
  assert_eq!(page.items[0].candidate.full_name.as_deref(), Some("Ada King"));
}

#[tokio::test]
async fn known_candidate_is_linked_to_a_new_search() {
  let store = store().await;
  let first = search(&store).await;
  let second = search(&store).await;
  let repo = CandidateRepository::new(store.clone());
  let batch = [sourced("https://www.linkedin.com/in/ada", "Ada")];

  repo.persist(first, &batch, &[]).await.unwrap();
  let report = repo.persist(second, &batch, &[]).await.unwrap();
  assert_eq!((report.saved, report.updated, report.linked), (0, 1, 1));
}

#[tokio::test]
async fn attribution_is_idempotent_and_skips_unknown_strategies() {
  let store = store().await;
  let search_id = search(&store).await;
  let strategy = store.create_strategy(search_id, json!({})).await.unwrap().strategy_id;
  let repo = CandidateRepository::new(store.clone());
  let batch = [
    sourced("https://www.linkedin.com/in/ada", "Ada"),
    sourced("https://www.linkedin.com/in/grace", "Grace"),
  ];

  let first = repo.persist(search_id, &batch, &[strategy, Uuid::new_v4()]).await.unwrap();
  assert_eq!(first.attributed, 2);

  let second = repo.persist(search_id, &batch, &[strategy]).await.unwrap();
  assert_eq!(second.attributed, 0);
  assert_eq!(second.linked, 0);
}

#[tokio::test]
async fn empty_batch_is_a_no_op() {
  let store = store().await;
  let search_id = search(&store).await;
  let repo = CandidateRepository::new(store.clone());

  let report = repo.persist(search_id, &[sourced("   ", "Blank")], &[]).await.unwrap();
  assert_eq!(report.dropped, 1);
  assert_eq!(report.saved + report.linked, 0);
}

#[tokio::test]
async fn dangling_attribution_rows_are_never_created() {
  let store = store().await;
  let search_id = search(&store).await;
  let report = CandidateRepository::new(store.clone())
    .persist(search_id, &[sourced("https://www.linkedin.com/in/ada", "Ada")], &[Uuid::new_v4()])
    .await
    .unwrap();
  assert_eq!(report.attributed, 0);

  let link = store.unscored_search_candidate_ids(search_id).await.unwrap()[0];
  let ghost = Attribution { search_candidate_id: link, strategy_id: Uuid::new_v4() };
  // The store itself refuses rows pointing at unknown strategies.
  assert!(store.insert_attributions(vec![ghost]).await.is_err());
}

#[tokio::test]
async fn failed_update_is_skipped_and_counted() {
  let store = store().await;
  let search_id = search(&store).await;
  let urls = [
    "https://www.linkedin.com/in/ada",
    "https://www.linkedin.com/in/grace",
    "https://www.linkedin.com/in/linus",
  ];
  let first: Vec<SourcedRecord> = urls.iter().map(|u| sourced(u, "Before")).collect();
  CandidateRepository::new(store.clone()).persist(search_id, &first, &[]).await.unwrap();

  let ids = store
    .find_candidates_by_url(urls.iter().map(|u| u.to_string()).collect())
    .await
    .unwrap();
  let grace = ids[urls[1]];
  let repo = CandidateRepository::new(FlakyStore::failing_update(store.clone(), grace));

  let second: Vec<SourcedRecord> = urls.iter().map(|u| sourced(u, "After")).collect();
  let report = repo.persist(search_id, &second, &[]).await.unwrap();
  assert_eq!((report.saved, report.updated, report.failed_updates), (0, 2, 1));

  let mut names = Vec::new();
  for url in urls {
    let candidate = store.get_candidate(ids[url]).await.unwrap().unwrap();
    names.push(candidate.full_name.unwrap_or_default());
  }
  assert_eq!(names, ["After", "Before", "After"]);
}

#[tokio::test]
async fn failed_link_insert_keeps_the_candidates() {
  let store = store().await;
  let search_id = search(&store).await;
  let strategy = store.create_strategy(search_id, json!({})).await.unwrap().strategy_id;
  let batch = [
    sourced("https://www.linkedin.com/in/ada", "Ada"),
    sourced("https://www.linkedin.com/in/grace", "Grace"),
  ];

  let report = CandidateRepository::new(FlakyStore::failing_links(store.clone()))
    .persist(search_id, &batch, &[strategy])
    .await
    .unwrap();
  assert_eq!((report.saved, report.linked, report.attributed), (2, 0, 0));

  let found = store
    .find_candidates_by_url(vec![
      "https://www.linkedin.com/in/ada".into(),
      "https://www.linkedin.com/in/grace".into(),
    ])
    .await
    .unwrap();
  assert_eq!(found.len(), 2);
  assert!(store.unscored_search_candidate_ids(search_id).await.unwrap().is_empty());

  // A later batch links what the failed one could not.
  let retry = CandidateRepository::new(store.clone())
    .persist(search_id, &batch, &[strategy])
    .await
    .unwrap();
  assert_eq!((retry.saved, retry.updated, retry.linked, retry.attributed), (0, 2, 2, 2));
}
