//! Enrichment State Machine: reveal a candidate's contact details through an
//! initiate-then-poll provider.
//!
//! ```text
//! INITIATED ──warm-up──▶ POLLING ──▶ FOUND | PARTIAL | NOT_FOUND
//!                           │
//!                           └─ attempts exhausted ──▶ TIMEOUT
//! ```
//!
//! Any unrecoverable failure along the way ends in `ERROR`. The attempt
//! counter is local to one run; nothing is shared between runs.

use std::{sync::Arc, time::Duration};

use sourcer_core::{
  access::AccessGuard,
  enrichment::{
    ContactKind, ContactRequest, EnrichmentError, EnrichmentOutcome, EnrichmentProvider,
    JobHandle, PollVerdict, evaluate_poll,
  },
  profile_url,
  store::CandidateStore,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{EnrichCandidateError, store_err};

/// Timing of the polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrichmentConfig {
  /// Delay between initiating a job and the first poll.
  pub warmup:        Duration,
  pub poll_interval: Duration,
  pub max_attempts:  u32,
}

impl Default for EnrichmentConfig {
  fn default() -> Self {
    Self {
      warmup:        Duration::from_millis(1500),
      poll_interval: Duration::from_millis(1000),
      max_attempts:  60,
    }
  }
}

/// States a run moves through before it reaches an outcome.
#[derive(Debug)]
enum State {
  Initiated(JobHandle),
  Polling { handle: JobHandle, attempt: u32 },
}

#[derive(Clone)]
pub struct EnrichmentMachine {
  provider: Arc<dyn EnrichmentProvider>,
  config:   EnrichmentConfig,
}

impl EnrichmentMachine {
  pub fn new(provider: Arc<dyn EnrichmentProvider>, config: EnrichmentConfig) -> Self {
    Self { provider, config }
  }

  /// Run one enrichment to completion. Always returns within the configured
  /// attempt budget.
  pub async fn run(&self, raw_url: &str, request: ContactRequest) -> EnrichmentOutcome {
    let url = match profile_url::canonicalize(raw_url) {
      Ok(url) => url,
      Err(e) => return error_outcome(EnrichmentError::Validation(e.to_string())),
    };

    let handle = match self.provider.initiate(&url, request).await {
      Ok(handle) => handle,
      Err(e) => {
        warn!(profile_url = %url, error = %e, "enrichment initiate failed");
        return error_outcome(e);
      }
    };

    let mut state = State::Initiated(handle);
    loop {
      state = match state {
        State::Initiated(handle) => {
          info!(profile_url = %url, ?request, job = %handle.0, "enrichment initiated");
          tokio::time::sleep(self.config.warmup).await;
          State::Polling { handle, attempt: 1 }
        }
        State::Polling { attempt, .. } if attempt > self.config.max_attempts => {
          info!(profile_url = %url, attempts = self.config.max_attempts, "enrichment timed out");
          return EnrichmentOutcome::Timeout { attempts: self.config.max_attempts };
        }
        State::Polling { handle, attempt } => {
          match self.provider.poll(&handle).await {
            Ok(response) => match evaluate_poll(request, &response) {
              PollVerdict::Done(outcome) => {
                info!(profile_url = %url, attempt, outcome = ?outcome, "enrichment finished");
                return outcome;
              }
              PollVerdict::Pending => debug!(profile_url = %url, attempt, "enrichment pending"),
              PollVerdict::Transient => {
                debug!(profile_url = %url, attempt, status = response.status, "transient poll status")
              }
            },
            Err(EnrichmentError::Transport(e)) => {
              debug!(profile_url = %url, attempt, error = %e, "poll transport error")
            }
            Err(e) => {
              warn!(profile_url = %url, attempt, error = %e, "enrichment poll failed");
              return error_outcome(e);
            }
          }
          if attempt < self.config.max_attempts {
            tokio::time::sleep(self.config.poll_interval).await;
          }
          State::Polling { handle, attempt: attempt + 1 }
        }
      };
    }
  }
}

fn error_outcome(err: EnrichmentError) -> EnrichmentOutcome {
  EnrichmentOutcome::Error { message: err.to_string() }
}

// ─── Candidate enrichment ────────────────────────────────────────────────────

/// Runs the state machine for a candidate linked to a search and keeps what
/// it reveals.
pub struct CandidateEnricher<S> {
  store:   Arc<S>,
  guard:   Arc<dyn AccessGuard>,
  machine: EnrichmentMachine,
}

impl<S> Clone for CandidateEnricher<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), guard: self.guard.clone(), machine: self.machine.clone() }
  }
}

impl<S: CandidateStore> CandidateEnricher<S> {
  pub fn new(store: Arc<S>, guard: Arc<dyn AccessGuard>, machine: EnrichmentMachine) -> Self {
    Self { store, guard, machine }
  }

  /// Enrich the candidate behind `search_candidate_id`.
  ///
  /// Read access to the owning search and write permission for its
  /// organization are checked before the provider is contacted.
  pub async fn enrich(
    &self,
    search_candidate_id: Uuid,
    request: ContactRequest,
  ) -> Result<EnrichmentOutcome, EnrichCandidateError> {
    let link = self
      .store
      .get_search_candidate(search_candidate_id)
      .await
      .map_err(|e| EnrichCandidateError::Store(store_err(e)))?
      .ok_or(EnrichCandidateError::SearchCandidateNotFound(search_candidate_id))?;
    self.guard.assert_read_access(link.search_id).await?;

    let search = self
      .store
      .get_search(link.search_id)
      .await
      .map_err(|e| EnrichCandidateError::Store(store_err(e)))?
      .ok_or(EnrichCandidateError::SearchCandidateNotFound(search_candidate_id))?;
    self.guard.assert_write_allowed(search.organization_id).await?;

    let candidate_id = link.candidate_id;
    let candidate = self
      .store
      .get_candidate(candidate_id)
      .await
      .map_err(|e| EnrichCandidateError::Store(store_err(e)))?
      .ok_or(EnrichCandidateError::CandidateNotFound(candidate_id))?;

    let outcome = self.machine.run(&candidate.profile_url, request).await;
    if !outcome.is_success() {
      return Ok(outcome);
    }

    // Only kinds that were requested and revealed replace what is stored.
    let reveal = |kind: ContactKind, values: &[String]| {
      (request.wants(kind) && !values.is_empty()).then(|| values.to_vec())
    };
    let emails = reveal(ContactKind::Email, outcome.emails());
    let phones = reveal(ContactKind::Phone, outcome.phones());
    self
      .store
      .set_candidate_contacts(candidate_id, emails, phones)
      .await
      .map_err(|e| EnrichCandidateError::Store(store_err(e)))?;

    Ok(outcome)
  }
}
