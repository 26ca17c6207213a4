//! Contact enrichment: the provider interface, the request/outcome types, and
//! the defensive parsing of poll responses.
//!
//! The initiate-then-poll loop itself lives in `sourcer-pipeline`; everything
//! here is pure so the parsing rules can be tested in isolation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ─── Request ─────────────────────────────────────────────────────────────────

/// One kind of contact detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactKind {
  Email,
  Phone,
}

/// Which contact details to reveal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactRequest {
  #[default]
  Email,
  Phone,
  Both,
}

impl ContactRequest {
  /// Build a request from optional include flags.
  ///
  /// Both flags set selects `Both`; only the phone flag selects `Phone`;
  /// every other combination (including none) selects `Email`.
  pub fn from_flags(include_email: Option<bool>, include_phone: Option<bool>) -> Self {
    match (include_email.unwrap_or(false), include_phone.unwrap_or(false)) {
      (true, true) => Self::Both,
      (false, true) => Self::Phone,
      _ => Self::Email,
    }
  }

  pub fn kinds(self) -> &'static [ContactKind] {
    match self {
      Self::Email => &[ContactKind::Email],
      Self::Phone => &[ContactKind::Phone],
      Self::Both => &[ContactKind::Email, ContactKind::Phone],
    }
  }

  pub fn wants(self, kind: ContactKind) -> bool { self.kinds().contains(&kind) }
}

// ─── Provider interface ──────────────────────────────────────────────────────

/// Opaque locator for a pending enrichment job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle(pub String);

/// A raw poll reply. Non-2xx statuses are transient.
#[derive(Debug, Clone)]
pub struct PollResponse {
  pub status: u16,
  pub body:   Value,
}

impl PollResponse {
  pub fn is_success(&self) -> bool { (200..300).contains(&self.status) }
}

#[derive(Debug, Error)]
pub enum EnrichmentError {
  #[error("enrichment provider is not configured: {0}")]
  Configuration(String),

  #[error("invalid enrichment request: {0}")]
  Validation(String),

  #[error("transport error: {0}")]
  Transport(String),

  #[error("malformed initiate response: {0}")]
  MalformedInitiate(String),
}

#[async_trait]
pub trait EnrichmentProvider: Send + Sync {
  async fn initiate(
    &self,
    profile_url: &str,
    request: ContactRequest,
  ) -> Result<JobHandle, EnrichmentError>;

  async fn poll(&self, handle: &JobHandle) -> Result<PollResponse, EnrichmentError>;
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// Terminal result of one enrichment run. Callers never see a raw error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EnrichmentOutcome {
  Found {
    emails: Vec<String>,
    phones: Vec<String>,
  },
  /// `Both` was requested and the job finished with only some kinds present.
  /// This counts as success.
  Partial {
    emails:  Vec<String>,
    phones:  Vec<String>,
    missing: Vec<ContactKind>,
  },
  NotFound,
  Timeout {
    attempts: u32,
  },
  Error {
    message: String,
  },
}

impl EnrichmentOutcome {
  pub fn is_success(&self) -> bool { matches!(self, Self::Found { .. } | Self::Partial { .. }) }

  pub fn emails(&self) -> &[String] {
    match self {
      Self::Found { emails, .. } | Self::Partial { emails, .. } => emails,
      _ => &[],
    }
  }

  pub fn phones(&self) -> &[String] {
    match self {
      Self::Found { phones, .. } | Self::Partial { phones, .. } => phones,
      _ => &[],
    }
  }
}

// ─── Poll evaluation ─────────────────────────────────────────────────────────

/// What a single poll reply means for the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum PollVerdict {
  /// Non-2xx; counts as a wasted attempt.
  Transient,
  /// The job is still running.
  Pending,
  /// Reached a terminal outcome.
  Done(EnrichmentOutcome),
}

const EMAIL_KEYS: &[&str] = &[
  "email",
  "emails",
  "work_email",
  "personal_email",
  "email_address",
  "emailAddress",
];
const EMAIL_INNER_KEYS: &[&str] = &["email", "address", "value"];
const PHONE_KEYS: &[&str] = &[
  "phone",
  "phones",
  "phone_number",
  "phoneNumber",
  "phone_numbers",
  "mobile_phone",
  "mobilePhone",
];
const PHONE_INNER_KEYS: &[&str] = &["number", "phone", "sanitized_number", "raw_number", "value"];
const CONTAINER_KEYS: &[&str] = &["data", "result", "contact", "person"];
const STATUS_KEYS: &[&str] = &["status", "state", "job_status"];
const DONE_STATUSES: &[&str] = &[
  "completed",
  "complete",
  "done",
  "finished",
  "success",
  "succeeded",
  "not_found",
];
const FAILED_STATUSES: &[&str] = &["failed", "failure", "error", "errored", "cancelled", "canceled"];
const FAILURE_MESSAGE_KEYS: &[&str] = &["message", "error", "reason", "detail"];

impl ContactKind {
  fn keys(self) -> &'static [&'static str] {
    match self {
      Self::Email => EMAIL_KEYS,
      Self::Phone => PHONE_KEYS,
    }
  }

  fn inner_keys(self) -> &'static [&'static str] {
    match self {
      Self::Email => EMAIL_INNER_KEYS,
      Self::Phone => PHONE_INNER_KEYS,
    }
  }
}

/// Every value of `kind` in `body`.
///
/// The body itself is searched first, then the usual envelope keys (`data`,
/// `result`, ...). Within an object the first field name (in priority order)
/// that yields a non-empty value wins. A value may be a bare string, an object
/// carrying the value under one of several names, or an array of either.
pub fn extract_contacts(body: &Value, kind: ContactKind) -> Vec<String> {
  let mut found = std::iter::once(body)
    .chain(CONTAINER_KEYS.iter().filter_map(|k| body.get(*k)))
    .map(|container| extract_from_container(container, kind))
    .find(|values| !values.is_empty())
    .unwrap_or_default();
  dedup_in_order(&mut found);
  found
}

fn extract_from_container(container: &Value, kind: ContactKind) -> Vec<String> {
  match container {
    Value::Array(items) => items.iter().flat_map(|i| extract_from_container(i, kind)).collect(),
    Value::Object(map) => kind
      .keys()
      .iter()
      .filter_map(|k| map.get(*k))
      .map(|v| values_of(v, kind))
      .find(|values| !values.is_empty())
      .unwrap_or_default(),
    _ => Vec::new(),
  }
}

fn values_of(value: &Value, kind: ContactKind) -> Vec<String> {
  match value {
    Value::String(s) => {
      let s = s.trim();
      if s.is_empty() { Vec::new() } else { vec![s.to_owned()] }
    }
    Value::Array(items) => items.iter().flat_map(|i| values_of(i, kind)).collect(),
    Value::Object(map) => kind
      .inner_keys()
      .iter()
      .filter_map(|k| map.get(*k).and_then(Value::as_str))
      .map(str::trim)
      .find(|s| !s.is_empty())
      .map(|s| vec![s.to_owned()])
      .unwrap_or_default(),
    _ => Vec::new(),
  }
}

fn dedup_in_order(values: &mut Vec<String>) {
  let mut seen = std::collections::HashSet::new();
  values.retain(|v| seen.insert(v.clone()));
}

/// Whether the job reports that it has finished, whatever it found.
pub fn job_finished(body: &Value) -> bool {
  std::iter::once(body)
    .chain(CONTAINER_KEYS.iter().filter_map(|k| body.get(*k)))
    .any(|container| {
      STATUS_KEYS.iter().any(|k| {
        container
          .get(*k)
          .and_then(Value::as_str)
          .is_some_and(|s| DONE_STATUSES.contains(&s.to_ascii_lowercase().as_str()))
      }) || container.get("done").and_then(Value::as_bool).unwrap_or(false)
    })
}

/// The provider's explanation when the job reports that it failed.
///
/// Falls back to the reported status when no message accompanies it.
pub fn job_failure(body: &Value) -> Option<String> {
  std::iter::once(body)
    .chain(CONTAINER_KEYS.iter().filter_map(|k| body.get(*k)))
    .filter_map(Value::as_object)
    .find_map(|map| {
      let status = STATUS_KEYS
        .iter()
        .filter_map(|k| map.get(*k).and_then(Value::as_str))
        .find(|s| FAILED_STATUSES.contains(&s.to_ascii_lowercase().as_str()))?;
      Some(
        crate::raw::first_str(map, FAILURE_MESSAGE_KEYS)
          .unwrap_or_else(|| format!("enrichment job {status}")),
      )
    })
}

/// Classify one poll reply for `request`.
pub fn evaluate_poll(request: ContactRequest, response: &PollResponse) -> PollVerdict {
  if !response.is_success() {
    return PollVerdict::Transient;
  }
  if let Some(message) = job_failure(&response.body) {
    return PollVerdict::Done(EnrichmentOutcome::Error { message });
  }

  let emails = if request.wants(ContactKind::Email) {
    extract_contacts(&response.body, ContactKind::Email)
  } else {
    Vec::new()
  };
  let phones = if request.wants(ContactKind::Phone) {
    extract_contacts(&response.body, ContactKind::Phone)
  } else {
    Vec::new()
  };

  let missing: Vec<ContactKind> = request
    .kinds()
    .iter()
    .copied()
    .filter(|k| match k {
      ContactKind::Email => emails.is_empty(),
      ContactKind::Phone => phones.is_empty(),
    })
    .collect();

  if missing.is_empty() {
    return PollVerdict::Done(EnrichmentOutcome::Found { emails, phones });
  }
  if !job_finished(&response.body) {
    return PollVerdict::Pending;
  }
  if missing.len() == request.kinds().len() {
    PollVerdict::Done(EnrichmentOutcome::NotFound)
  } else {
    PollVerdict::Done(EnrichmentOutcome::Partial { emails, phones, missing })
  }
}
