use std::{
  sync::{Arc, atomic::Ordering},
  time::Duration,
};

use serde_json::json;
use sourcer_core::{
  access::AllowAll,
  candidate::NewCandidate,
  enrichment::{ContactKind, ContactRequest, EnrichmentError, EnrichmentOutcome},
  store::{CandidateStore, NewLink},
};
use sourcer_store_sqlite::SqliteStore;
use uuid::Uuid;

use super::{
  fakes::{DenyAll, ScriptedEnrichment, reply, running},
  search, store,
};
use crate::{CandidateEnricher, EnrichmentConfig, EnrichmentMachine, error::EnrichCandidateError};

const URL: &str = "https://www.linkedin.com/in/ada";

fn instant(max_attempts: u32) -> EnrichmentConfig {
  EnrichmentConfig { warmup: Duration::ZERO, poll_interval: Duration::ZERO, max_attempts }
}

fn machine(provider: &Arc<ScriptedEnrichment>, max_attempts: u32) -> EnrichmentMachine {
  EnrichmentMachine::new(provider.clone(), instant(max_attempts))
}

#[tokio::test]
async fn found_after_a_few_polls() {
  let provider = ScriptedEnrichment::new(vec![
    running(),
    running(),
    reply(200, json!({ "status": "completed", "data": { "emails": [{ "email": "ada@example.com" }, "ada@work.io"] } })),
  ]);

  let outcome = machine(&provider, 10).run(URL, ContactRequest::Email).await;
  assert_eq!(outcome, EnrichmentOutcome::Found {
    emails: vec!["ada@example.com".into(), "ada@work.io".into()],
    phones: vec![],
  });
  assert_eq!(provider.polls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn non_success_polls_are_wasted_attempts() {
  let provider = ScriptedEnrichment::new(vec![
    reply(502, json!(null)),
    reply(429, json!({ "error": "slow down" })),
    reply(200, json!({ "phone": "+44 20 7946 0000" })),
  ]);

  let outcome = machine(&provider, 3).run(URL, ContactRequest::Phone).await;
  assert_eq!(outcome.phones(), ["+44 20 7946 0000"]);
}

#[tokio::test]
async fn transport_errors_while_polling_are_retried() {
  let provider = ScriptedEnrichment::new(vec![
    Err(EnrichmentError::Transport("connection reset".into())),
    reply(200, json!({ "email": "ada@example.com" })),
  ]);

  let outcome = machine(&provider, 5).run(URL, ContactRequest::Email).await;
  assert!(outcome.is_success());
}

#[tokio::test]
async fn finished_job_without_values_is_not_found() {
  let provider = ScriptedEnrichment::new(vec![running(), reply(200, json!({ "status": "completed" }))]);
  let outcome = machine(&provider, 10).run(URL, ContactRequest::Email).await;
  assert_eq!(outcome, EnrichmentOutcome::NotFound);
}

#[tokio::test]
async fn budget_exhaustion_times_out() {
  let provider = ScriptedEnrichment::new(vec![]);
  let outcome = machine(&provider, 7).run(URL, ContactRequest::Both).await;
  assert_eq!(outcome, EnrichmentOutcome::Timeout { attempts: 7 });
  assert_eq!(provider.polls.load(Ordering::SeqCst), 7);
}

#[tokio::test]
async fn both_kinds_with_only_one_present_is_partial() {
  let provider = ScriptedEnrichment::new(vec![
    reply(200, json!({ "status": "processing", "email": "ada@example.com" })),
    reply(200, json!({ "status": "done", "email": "ada@example.com" })),
  ]);

  let outcome = machine(&provider, 5).run(URL, ContactRequest::Both).await;
  assert_eq!(outcome, EnrichmentOutcome::Partial {
    emails:  vec!["ada@example.com".into()],
    phones:  vec![],
    missing: vec![ContactKind::Phone],
  });
  assert!(outcome.is_success());
  assert_eq!(provider.polls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn initiate_failure_is_an_error_outcome() {
  let provider =
    ScriptedEnrichment::failing_initiate(EnrichmentError::Configuration("missing API key".into()));
  let outcome = machine(&provider, 5).run(URL, ContactRequest::Email).await;
  match outcome {
    EnrichmentOutcome::Error { message } => assert!(message.contains("missing API key")),
    other => panic!("unexpected outcome {other:?}"),
  }
  assert_eq!(provider.polls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn invalid_profile_url_is_rejected_before_any_call() {
  let provider = ScriptedEnrichment::new(vec![]);
  let outcome = machine(&provider, 5).run("   ", ContactRequest::Email).await;
  assert!(matches!(outcome, EnrichmentOutcome::Error { .. }));
  assert_eq!(provider.initiated.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_job_is_an_error_outcome() {
  let provider = ScriptedEnrichment::new(vec![
    running(),
    reply(200, json!({ "status": "failed", "message": "provider quota exhausted" })),
  ]);
  let outcome = machine(&provider, 10).run(URL, ContactRequest::Email).await;
  match outcome {
    EnrichmentOutcome::Error { message } => assert!(message.contains("quota"), "{message}"),
    other => panic!("unexpected outcome {other:?}"),
  }
  assert_eq!(provider.polls.load(Ordering::SeqCst), 2);
}

/// A stored candidate linked to a fresh search, as `(link id, candidate id)`.
async fn linked_candidate(store: &SqliteStore) -> (Uuid, Uuid) {
  let search_id = search(store).await;
  let candidate = store
    .insert_candidates(vec![NewCandidate {
      profile_url: URL.into(),
      full_name:   Some("Ada".into()),
      headline:    None,
      location:    None,
      experience:  json!(null),
      education:   json!(null),
      skills:      json!(null),
      source:      "directory".into(),
    }])
    .await
    .unwrap()
    .remove(0);
  let link = store
    .insert_links(search_id, vec![NewLink {
      candidate_id: candidate.candidate_id,
      source:       "directory".into(),
    }])
    .await
    .unwrap()
    .remove(0);
  (link.search_candidate_id, candidate.candidate_id)
}

#[tokio::test]
async fn revealed_contacts_are_stored_on_the_candidate() {
  let store = store().await;
  let (link_id, candidate_id) = linked_candidate(&store).await;
  let provider = ScriptedEnrichment::new(vec![reply(200, json!({
    "status": "completed",
    "result": { "emails": ["ada@example.com"], "phone_numbers": [{ "sanitized_number": "+442079460000" }] }
  }))]);
  let enricher = CandidateEnricher::new(store.clone(), Arc::new(AllowAll), machine(&provider, 5));

  let outcome = enricher.enrich(link_id, ContactRequest::Both).await.unwrap();
  assert!(matches!(outcome, EnrichmentOutcome::Found { .. }));

  let stored = store.get_candidate(candidate_id).await.unwrap().unwrap();
  assert_eq!(stored.emails, vec!["ada@example.com"]);
  assert_eq!(stored.phones, vec!["+442079460000"]);

  let missing = enricher.enrich(Uuid::new_v4(), ContactRequest::Email).await;
  assert!(matches!(missing, Err(EnrichCandidateError::SearchCandidateNotFound(_))));
}

#[tokio::test]
async fn denied_enrichment_never_reaches_the_provider() {
  let store = store().await;
  let (link_id, candidate_id) = linked_candidate(&store).await;
  let provider = ScriptedEnrichment::new(vec![reply(200, json!({ "email": "ada@example.com" }))]);
  let enricher = CandidateEnricher::new(store.clone(), Arc::new(DenyAll), machine(&provider, 5));

  let err = enricher.enrich(link_id, ContactRequest::Email).await;
  assert!(matches!(err, Err(EnrichCandidateError::Forbidden(_))));
  assert_eq!(provider.initiated.load(Ordering::SeqCst), 0);

  let stored = store.get_candidate(candidate_id).await.unwrap().unwrap();
  assert!(stored.emails.is_empty());
}
