//! JSON profile directory over HTTP.

use async_trait::async_trait;
use serde_json::Value;
use sourcer_core::{
  provider::{ProfileProvider, ProviderError, SourceQuery},
  raw::RawCandidate,
};
use tracing::{debug, info};
use url::Url;

use super::authorize;

/// Envelope keys under which directories return their result list.
const LIST_KEYS: &[&str] = &["results", "data", "items", "profiles", "people"];

/// A directory that answers `POST {endpoint}` with a [`SourceQuery`] body.
#[derive(Clone)]
pub struct HttpDirectoryProvider {
  client:   reqwest::Client,
  name:     String,
  endpoint: Url,
  api_key:  Option<String>,
}

impl HttpDirectoryProvider {
  pub fn new(client: reqwest::Client, name: String, endpoint: Url, api_key: Option<String>) -> Self {
    Self { client, name, endpoint, api_key }
  }
}

#[async_trait]
impl ProfileProvider for HttpDirectoryProvider {
  fn name(&self) -> &str { &self.name }

  async fn search(&self, query: &SourceQuery) -> Result<Vec<RawCandidate>, ProviderError> {
    info!(provider = %self.name, page = query.page, "querying directory");

    let resp = authorize(self.client.post(self.endpoint.clone()), self.api_key.as_deref())
      .json(query)
      .send()
      .await
      .map_err(|e| ProviderError::Transport(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(ProviderError::Status { status: status.as_u16(), body });
    }

    let body: Value = resp.json().await.map_err(|e| ProviderError::Schema(e.to_string()))?;
    parse_results(body)
  }
}

/// Accept a bare array or an object wrapping one. Items that are not objects
/// are skipped.
fn parse_results(body: Value) -> Result<Vec<RawCandidate>, ProviderError> {
  let items = match body {
    Value::Array(items) => items,
    Value::Object(mut map) => LIST_KEYS
      .iter()
      .find_map(|k| match map.remove(*k) {
        Some(Value::Array(items)) => Some(items),
        _ => None,
      })
      .ok_or_else(|| ProviderError::Schema("no result list in response".into()))?,
    other => return Err(ProviderError::Schema(format!("expected a list, got {other}"))),
  };

  let total = items.len();
  let records: Vec<RawCandidate> =
    items.into_iter().filter_map(|item| serde_json::from_value(item).ok()).collect();
  if records.len() < total {
    debug!(skipped = total - records.len(), "skipped unreadable directory items");
  }
  Ok(records)
}
