//! Integration tests for `SqliteStore` against an in-memory database.

use serde_json::json;
use sourcer_core::{
  candidate::{CandidateStatus, NewCandidate, SearchCandidatePatch},
  search::{NewSearch, SearchStatus, StrategyStatus},
  store::{Attribution, CandidateQuery, CandidateStore, NewLink, SortKey},
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn search(s: &SqliteStore) -> Uuid {
  s.create_search(NewSearch {
    organization_id: Uuid::new_v4(),
    query_text:      "rust engineers in berlin".into(),
    criteria:        json!({ "skills": ["rust"], "location": "Berlin" }),
  })
  .await
  .unwrap()
  .search_id
}

fn profile(url: &str, name: &str) -> NewCandidate {
  NewCandidate {
    profile_url: url.into(),
    full_name:   Some(name.into()),
    headline:    Some("Engineer".into()),
    location:    None,
    experience:  json!([{ "company": "Acme" }]),
    education:   json!(null),
    skills:      json!(["rust"]),
    source:      "directory".into(),
  }
}

/// Insert `n` candidates and link them all to `search_id`, returning the
/// search candidate ids in insertion order.
async fn seed_links(s: &SqliteStore, search_id: Uuid, n: usize) -> Vec<Uuid> {
  let batch = (0..n)
    .map(|i| profile(&format!("https://www.linkedin.com/in/p{i}"), &format!("P{i}")))
    .collect();
  let inserted = s.insert_candidates(batch).await.unwrap();
  let links = inserted
    .iter()
    .map(|c| NewLink { candidate_id: c.candidate_id, source: "directory".into() })
    .collect();
  s.insert_links(search_id, links)
    .await
    .unwrap()
    .into_iter()
    .map(|l| l.search_candidate_id)
    .collect()
}

// ─── Searches ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_search() {
  let s = store().await;
  let id = search(&s).await;

  let fetched = s.get_search(id).await.unwrap().unwrap();
  assert_eq!(fetched.status, SearchStatus::Created);
  assert_eq!(fetched.progress, 0);
  assert_eq!(fetched.criteria["location"], "Berlin");
}

#[tokio::test]
async fn get_search_missing_returns_none() {
  let s = store().await;
  assert!(s.get_search(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn status_update_clamps_progress() {
  let s = store().await;
  let id = search(&s).await;

  s.update_search_status(id, SearchStatus::Executing, 250).await.unwrap();
  let fetched = s.get_search(id).await.unwrap().unwrap();
  assert_eq!(fetched.status, SearchStatus::Executing);
  assert_eq!(fetched.progress, 100);
}

#[tokio::test]
async fn status_update_on_unknown_search_errors() {
  let s = store().await;
  let err = s
    .update_search_status(Uuid::new_v4(), SearchStatus::Completed, 100)
    .await
    .unwrap_err();
  assert!(err.is_not_found());
}

// ─── Strategies ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn strategy_runs_count_up() {
  let s = store().await;
  let search_id = search(&s).await;
  let strategy = s.create_strategy(search_id, json!({ "title": "rust" })).await.unwrap();
  assert_eq!(strategy.run_count, 0);

  let first = s.start_strategy_run(strategy.strategy_id).await.unwrap();
  assert_eq!(first.run_count, 0);
  s.finish_strategy_run(strategy.strategy_id, StrategyStatus::Completed).await.unwrap();

  let second = s.start_strategy_run(strategy.strategy_id).await.unwrap();
  assert_eq!(second.run_count, 1);

  let now = s.get_strategy(strategy.strategy_id).await.unwrap().unwrap();
  assert_eq!(now.run_count, 2);
  assert_eq!(now.status, StrategyStatus::Running);
}

#[tokio::test]
async fn strategy_for_unknown_search_is_rejected() {
  let s = store().await;
  let err = s.create_strategy(Uuid::new_v4(), json!({})).await.unwrap_err();
  assert!(matches!(err, Error::SearchNotFound(_)));
}

#[tokio::test]
async fn existing_strategy_ids_filters_dangling() {
  let s = store().await;
  let search_id = search(&s).await;
  let a = s.create_strategy(search_id, json!({})).await.unwrap().strategy_id;
  let b = s.create_strategy(search_id, json!({})).await.unwrap().strategy_id;
  let ghost = Uuid::new_v4();

  let found = s.existing_strategy_ids(vec![a, ghost, b]).await.unwrap();
  assert_eq!(found.len(), 2);
  assert!(found.contains(&a) && found.contains(&b));
  assert!(s.existing_strategy_ids(vec![]).await.unwrap().is_empty());

  let listed = s.list_strategies(search_id).await.unwrap();
  assert_eq!(listed.iter().map(|st| st.strategy_id).collect::<Vec<_>>(), vec![a, b]);
}

// ─── Candidates ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_url_is_not_inserted_twice() {
  let s = store().await;
  let url = "https://www.linkedin.com/in/ada";

  let first = s.insert_candidates(vec![profile(url, "Ada")]).await.unwrap();
  assert_eq!(first.len(), 1);

  let second = s.insert_candidates(vec![profile(url, "Ada L.")]).await.unwrap();
  assert!(second.is_empty());

  let found = s.find_candidates_by_url(vec![url.into(), "https://x.io/y".into()]).await.unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[url], first[0].candidate_id);
}

#[tokio::test]
async fn update_candidate_overwrites_profile() {
  let s = store().await;
  let url = "https://www.linkedin.com/in/ada";
  let id = s.insert_candidates(vec![profile(url, "Ada")]).await.unwrap()[0].candidate_id;

  let mut newer = profile(url, "Ada Lovelace");
  newer.location = Some("London".into());
  s.update_candidate(id, newer).await.unwrap();

  let fetched = s.get_candidate(id).await.unwrap().unwrap();
  assert_eq!(fetched.full_name.as_deref(), Some("Ada Lovelace"));
  assert_eq!(fetched.location.as_deref(), Some("London"));
  assert!(fetched.emails.is_empty());
}

#[tokio::test]
async fn contacts_are_replaced_per_kind() {
  let s = store().await;
  let id = s
    .insert_candidates(vec![profile("https://www.linkedin.com/in/ada", "Ada")])
    .await
    .unwrap()[0]
    .candidate_id;

  s.set_candidate_contacts(id, Some(vec!["ada@example.com".into()]), None).await.unwrap();
  s.set_candidate_contacts(id, None, Some(vec!["+44 20 0000".into()])).await.unwrap();

  let fetched = s.get_candidate(id).await.unwrap().unwrap();
  assert_eq!(fetched.emails, vec!["ada@example.com"]);
  assert_eq!(fetched.phones, vec!["+44 20 0000"]);

  let err = s.set_candidate_contacts(Uuid::new_v4(), None, None).await.unwrap_err();
  assert!(matches!(err, Error::CandidateNotFound(_)));
}

// ─── Links and attributions ──────────────────────────────────────────────────

#[tokio::test]
async fn links_are_unique_per_search() {
  let s = store().await;
  let search_id = search(&s).await;
  let other_search = search(&s).await;
  let candidate = s
    .insert_candidates(vec![profile("https://www.linkedin.com/in/ada", "Ada")])
    .await
    .unwrap()[0]
    .candidate_id;
  let link = || vec![NewLink { candidate_id: candidate, source: "directory".into() }];

  assert_eq!(s.insert_links(search_id, link()).await.unwrap().len(), 1);
  assert!(s.insert_links(search_id, link()).await.unwrap().is_empty());
  assert_eq!(s.insert_links(other_search, link()).await.unwrap().len(), 1);

  let found = s.find_links(search_id, vec![candidate, Uuid::new_v4()]).await.unwrap();
  assert_eq!(found.len(), 1);
  assert!(found.contains_key(&candidate));
}

#[tokio::test]
async fn attributions_ignore_repeats() {
  let s = store().await;
  let search_id = search(&s).await;
  let strategy = s.create_strategy(search_id, json!({})).await.unwrap().strategy_id;
  let links = seed_links(&s, search_id, 2).await;

  let rows: Vec<Attribution> = links
    .iter()
    .map(|l| Attribution { search_candidate_id: *l, strategy_id: strategy })
    .collect();
  assert_eq!(s.insert_attributions(rows.clone()).await.unwrap(), 2);
  assert_eq!(s.insert_attributions(rows).await.unwrap(), 0);
}

#[tokio::test]
async fn strategy_scores_join_attributions_to_scores() {
  let s = store().await;
  let search_id = search(&s).await;
  let strategy = s.create_strategy(search_id, json!({})).await.unwrap().strategy_id;
  let links = seed_links(&s, search_id, 3).await;

  s.insert_attributions(
    links
      .iter()
      .map(|l| Attribution { search_candidate_id: *l, strategy_id: strategy })
      .collect(),
  )
  .await
  .unwrap();
  s.record_score(links[0], 80.0, json!({})).await.unwrap();
  s.record_score(links[1], 60.0, json!({})).await.unwrap();

  let mut scores = s.strategy_scores(search_id).await.unwrap();
  scores.sort_by(|a, b| a.1.total_cmp(&b.1));
  assert_eq!(scores, vec![(strategy, 60.0), (strategy, 80.0)]);
}

// ─── Scoring ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn progress_tracks_scored_links() {
  let s = store().await;
  let search_id = search(&s).await;
  let links = seed_links(&s, search_id, 4).await;

  let p = s.scoring_progress(search_id).await.unwrap();
  assert_eq!((p.total, p.scored, p.unscored), (4, 0, 4));

  s.record_score(links[0], 140.0, json!({ "why": "strong" })).await.unwrap();
  s.record_score(links[2], 10.0, json!({})).await.unwrap();

  let p = s.scoring_progress(search_id).await.unwrap();
  assert_eq!((p.total, p.scored, p.unscored), (4, 2, 2));
  assert!(!p.is_scoring_complete);

  let unscored = s.unscored_search_candidate_ids(search_id).await.unwrap();
  assert_eq!(unscored, vec![links[1], links[3]]);

  let top = s.get_search_candidate(links[0]).await.unwrap().unwrap();
  assert_eq!(top.match_score, Some(100.0));
  assert_eq!(top.score_notes, Some(json!({ "why": "strong" })));
}

#[tokio::test]
async fn patch_updates_only_given_fields() {
  let s = store().await;
  let search_id = search(&s).await;
  let link = seed_links(&s, search_id, 1).await[0];

  let patched = s
    .update_search_candidate(link, SearchCandidatePatch {
      status: Some(CandidateStatus::Contacted),
      notes:  Some("left a voicemail".into()),
    })
    .await
    .unwrap();
  assert_eq!(patched.status, CandidateStatus::Contacted);

  let patched = s
    .update_search_candidate(link, SearchCandidatePatch { status: None, notes: None })
    .await
    .unwrap();
  assert_eq!(patched.status, CandidateStatus::Contacted);
  assert_eq!(patched.notes.as_deref(), Some("left a voicemail"));
}

// ─── Listing ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn listing_filters_by_score_range() {
  let s = store().await;
  let search_id = search(&s).await;
  let links = seed_links(&s, search_id, 4).await;
  for (link, score) in links.iter().zip([20.0, 55.0, 90.0]) {
    s.record_score(*link, score, json!({})).await.unwrap();
  }

  let all = s
    .list_candidates(&CandidateQuery { search_id, ..Default::default() })
    .await
    .unwrap();
  assert_eq!(all.total, 4);

  let mid = s
    .list_candidates(&CandidateQuery {
      search_id,
      score_min: Some(50.0),
      score_max: Some(95.0),
      sort: SortKey::ScoreDesc,
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(mid.total, 2);
  let scores: Vec<_> = mid.items.iter().map(|i| i.link.match_score).collect();
  assert_eq!(scores, vec![Some(90.0), Some(55.0)]);
}

#[tokio::test]
async fn score_sort_puts_unscored_last() {
  let s = store().await;
  let search_id = search(&s).await;
  let links = seed_links(&s, search_id, 3).await;
  s.record_score(links[1], 40.0, json!({})).await.unwrap();
  s.record_score(links[2], 70.0, json!({})).await.unwrap();

  let page = s
    .list_candidates(&CandidateQuery { search_id, sort: SortKey::ScoreAsc, ..Default::default() })
    .await
    .unwrap();
  let scores: Vec<_> = page.items.iter().map(|i| i.link.match_score).collect();
  assert_eq!(scores, vec![Some(40.0), Some(70.0), None]);
  assert_eq!(page.items[0].candidate.full_name.as_deref(), Some("P1"));
}

#[tokio::test]
async fn cursor_walks_every_page() {
  let s = store().await;
  let search_id = search(&s).await;
  let links = seed_links(&s, search_id, 5).await;

  let mut seen = Vec::new();
  let mut cursor = None;
  loop {
    let page = s
      .list_candidates(&CandidateQuery {
        search_id,
        sort: SortKey::DateAsc,
        limit: Some(2),
        cursor: cursor.clone(),
        ..Default::default()
      })
      .await
      .unwrap();
    assert_eq!(page.total, 5);
    seen.extend(page.items.iter().map(|i| i.link.search_candidate_id));
    match page.next_cursor {
      Some(next) => cursor = Some(next),
      None => break,
    }
  }
  assert_eq!(seen, links);
}

#[tokio::test]
async fn listing_is_scoped_to_search() {
  let s = store().await;
  let search_id = search(&s).await;
  let other = search(&s).await;
  seed_links(&s, search_id, 2).await;

  let page = s
    .list_candidates(&CandidateQuery { search_id: other, ..Default::default() })
    .await
    .unwrap();
  assert_eq!(page.total, 0);
  assert!(page.items.is_empty());
  assert!(page.next_cursor.is_none());
}

#[tokio::test]
async fn offset_beyond_i64_returns_an_empty_page() {
  let s = store().await;
  let search_id = search(&s).await;
  seed_links(&s, search_id, 2).await;

  let page = s
    .list_candidates(&CandidateQuery { search_id, offset: Some(1 << 63), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(page.total, 2);
  assert!(page.items.is_empty());
  assert!(page.next_cursor.is_none());
}

#[tokio::test]
async fn cursor_at_u64_max_returns_an_empty_page() {
  let s = store().await;
  let search_id = search(&s).await;
  seed_links(&s, search_id, 2).await;

  let page = s
    .list_candidates(&CandidateQuery {
      search_id,
      cursor: Some("o18446744073709551615".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(page.total, 2);
  assert!(page.items.is_empty());
  assert!(page.next_cursor.is_none());
}
