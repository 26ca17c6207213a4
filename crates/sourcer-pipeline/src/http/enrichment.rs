//! Contact enrichment provider over HTTP.
//!
//! `POST {endpoint}` starts a job and answers with a callback locator; polling
//! is a `GET` on that locator (absolute URL) or on `{endpoint}/{locator}`.
//! The API key only accompanies polls that stay on the endpoint's origin.

use async_trait::async_trait;
use serde_json::{Value, json};
use sourcer_core::{
  enrichment::{ContactKind, ContactRequest, EnrichmentError, EnrichmentProvider, JobHandle, PollResponse},
  raw::first_str,
};
use tracing::debug;
use url::Url;

use super::{authorize, join};

const HANDLE_KEYS: &[&str] =
  &["callback_url", "callbackUrl", "poll_url", "pollUrl", "job_id", "jobId", "request_id", "id"];

#[derive(Clone)]
pub struct HttpEnrichmentProvider {
  client:   reqwest::Client,
  endpoint: Url,
  api_key:  Option<String>,
}

impl HttpEnrichmentProvider {
  pub fn new(client: reqwest::Client, endpoint: Url, api_key: Option<String>) -> Self {
    Self { client, endpoint, api_key }
  }

  fn key(&self) -> Result<&str, EnrichmentError> {
    self
      .api_key
      .as_deref()
      .filter(|k| !k.is_empty())
      .ok_or_else(|| EnrichmentError::Configuration("missing enrichment API key".into()))
  }

  /// Where to poll `handle`, and whether the request may carry the key.
  fn poll_target(&self, handle: &JobHandle) -> (String, bool) {
    match Url::parse(&handle.0) {
      Ok(url) if matches!(url.scheme(), "http" | "https") => {
        let same_origin = url.origin() == self.endpoint.origin();
        (url.into(), same_origin)
      }
      _ => (join(&self.endpoint, &handle.0), true),
    }
  }
}

#[async_trait]
impl EnrichmentProvider for HttpEnrichmentProvider {
  async fn initiate(
    &self,
    profile_url: &str,
    request: ContactRequest,
  ) -> Result<JobHandle, EnrichmentError> {
    let key = self.key()?;
    let body = json!({
      "profile_url":   profile_url,
      "include_email": request.wants(ContactKind::Email),
      "include_phone": request.wants(ContactKind::Phone),
    });

    let resp = authorize(self.client.post(self.endpoint.clone()), Some(key))
      .json(&body)
      .send()
      .await
      .map_err(|e| EnrichmentError::Transport(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
      let text = resp.text().await.unwrap_or_default();
      return Err(EnrichmentError::MalformedInitiate(format!("status {status}: {text}")));
    }

    let reply: Value =
      resp.json().await.map_err(|e| EnrichmentError::MalformedInitiate(e.to_string()))?;
    let handle = parse_handle(&reply)?;
    debug!(job = %handle.0, "enrichment job accepted");
    Ok(handle)
  }

  async fn poll(&self, handle: &JobHandle) -> Result<PollResponse, EnrichmentError> {
    let key = self.key()?;
    let (target, same_origin) = self.poll_target(handle);
    if !same_origin {
      debug!(%target, "polling foreign callback without credentials");
    }

    let resp = authorize(self.client.get(target), same_origin.then_some(key))
      .send()
      .await
      .map_err(|e| EnrichmentError::Transport(e.to_string()))?;

    let status = resp.status().as_u16();
    let text = resp.text().await.map_err(|e| EnrichmentError::Transport(e.to_string()))?;
    let body = serde_json::from_str(&text).unwrap_or(Value::Null);
    Ok(PollResponse { status, body })
  }
}

/// The job locator, looked up at the top level and under `data`.
fn parse_handle(reply: &Value) -> Result<JobHandle, EnrichmentError> {
  std::iter::once(reply)
    .chain(reply.get("data"))
    .filter_map(Value::as_object)
    .find_map(|map| {
      first_str(map, HANDLE_KEYS).or_else(|| {
        HANDLE_KEYS.iter().find_map(|k| map.get(*k).and_then(Value::as_u64)).map(|n| n.to_string())
      })
    })
    .map(JobHandle)
    .ok_or_else(|| EnrichmentError::MalformedInitiate("no job locator in response".into()))
}
