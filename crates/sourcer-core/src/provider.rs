//! The provider search interface: one implementation per external profile
//! directory.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::raw::RawCandidate;

/// What a provider is asked for on one call.
#[derive(Debug, Clone, Serialize)]
pub struct SourceQuery {
  /// The search's structured criteria.
  pub criteria: serde_json::Value,
  /// The running strategy's parameters; `Null` for ad-hoc queries.
  pub params:   serde_json::Value,
  /// Zero-based page.
  pub page:     u32,
}

#[derive(Debug, Error)]
pub enum ProviderError {
  #[error("provider {0} is not configured: {1}")]
  Configuration(String, String),

  #[error("transport error: {0}")]
  Transport(String),

  #[error("provider returned status {status}: {body}")]
  Status { status: u16, body: String },

  #[error("unexpected response shape: {0}")]
  Schema(String),
}

/// An external profile directory.
///
/// Implementations report malformed responses as [`ProviderError::Schema`];
/// the aggregator never lets any provider error escape.
#[async_trait]
pub trait ProfileProvider: Send + Sync {
  /// Short tag recorded as the `source` of candidates found here.
  fn name(&self) -> &str;

  async fn search(&self, query: &SourceQuery) -> Result<Vec<RawCandidate>, ProviderError>;
}
