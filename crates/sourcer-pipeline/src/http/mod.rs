//! `reqwest` implementations of the external interfaces.
//!
//! Each client shares one [`reqwest::Client`] (cheap to clone, `Arc`-based)
//! and authenticates with an optional bearer token.

mod directory;
mod enrichment;
mod scoring;

use std::time::Duration;

pub use directory::HttpDirectoryProvider;
pub use enrichment::HttpEnrichmentProvider;
pub use scoring::HttpScoringService;

/// Build the HTTP client shared by every provider.
pub fn build_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
  reqwest::Client::builder().timeout(timeout).build()
}

fn authorize(req: reqwest::RequestBuilder, api_key: Option<&str>) -> reqwest::RequestBuilder {
  match api_key {
    Some(key) if !key.is_empty() => req.bearer_auth(key),
    _ => req,
  }
}

/// Append `path` to `base` with exactly one `/` between them.
fn join(base: &url::Url, path: &str) -> String {
  format!("{}/{}", base.as_str().trim_end_matches('/'), path.trim_start_matches('/'))
}
