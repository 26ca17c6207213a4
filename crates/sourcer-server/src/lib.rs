//! Server wiring: configuration, collaborator construction and the top-level
//! router.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use axum::Router;
use serde::Deserialize;
use sourcer_core::{access::AllowAll, planning::PlannerConfig, provider::ProfileProvider};
use sourcer_pipeline::{
  Collaborators, EnrichmentConfig, Pipeline, PipelineConfig,
  http::{HttpDirectoryProvider, HttpEnrichmentProvider, HttpScoringService, build_client},
};
use sourcer_store_sqlite::SqliteStore;
use tower_http::trace::TraceLayer;
use url::Url;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `SOURCER__*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:              String,
  #[serde(default = "default_port")]
  pub port:              u16,
  #[serde(default = "default_store_path")]
  pub store_path:        PathBuf,
  #[serde(default = "default_http_timeout")]
  pub http_timeout_secs: u64,
  /// Profile directories queried on every strategy run.
  #[serde(default)]
  pub providers:         Vec<ProviderConfig>,
  pub scoring:           EndpointConfig,
  pub enrichment:        EnrichmentSection,
  #[serde(default)]
  pub continuation:      ContinuationSection,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/sourcer/sourcer.db") }
fn default_http_timeout() -> u64 { 30 }

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
  pub name:     String,
  pub endpoint: String,
  pub api_key:  Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
  pub endpoint: String,
  pub api_key:  Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentSection {
  pub endpoint:         String,
  /// Missing keys surface as an error outcome on first use.
  pub api_key:          Option<String>,
  #[serde(default = "default_warmup")]
  pub warmup_ms:        u64,
  #[serde(default = "default_poll_interval")]
  pub poll_interval_ms: u64,
  #[serde(default = "default_max_attempts")]
  pub max_attempts:     u32,
}

fn default_warmup() -> u64 { 1500 }
fn default_poll_interval() -> u64 { 1000 }
fn default_max_attempts() -> u32 { 60 }

impl EnrichmentSection {
  pub fn timing(&self) -> EnrichmentConfig {
    EnrichmentConfig {
      warmup:        Duration::from_millis(self.warmup_ms),
      poll_interval: Duration::from_millis(self.poll_interval_ms),
      max_attempts:  self.max_attempts,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContinuationSection {
  pub target_candidates:  u32,
  pub candidates_per_run: u32,
  pub max_strategies:     usize,
}

impl Default for ContinuationSection {
  fn default() -> Self {
    let planner = PlannerConfig::default();
    Self {
      target_candidates:  planner.target_candidates,
      candidates_per_run: planner.candidates_per_run,
      max_strategies:     planner.max_strategies,
    }
  }
}

impl ContinuationSection {
  pub fn planner(&self) -> PlannerConfig {
    PlannerConfig {
      target_candidates: self.target_candidates,
      candidates_per_run: self.candidates_per_run,
      max_strategies: self.max_strategies,
      ..PlannerConfig::default()
    }
  }
}

/// Load configuration from an optional TOML file overlaid by the
/// environment (`SOURCER__PORT=9000`, `SOURCER__SCORING__API_KEY=...`).
pub fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("SOURCER").prefix_separator("__").separator("__"))
    .build()
    .context("failed to read configuration")?;

  settings.try_deserialize().context("failed to deserialise ServerConfig")
}

// ─── Wiring ──────────────────────────────────────────────────────────────────

fn parse_endpoint(what: &str, raw: &str) -> anyhow::Result<Url> {
  Url::parse(raw).with_context(|| format!("invalid {what} endpoint {raw:?}"))
}

/// Build every collaborator from `config` and assemble the pipeline.
pub fn build_pipeline(
  config: &ServerConfig,
  store: Arc<SqliteStore>,
) -> anyhow::Result<Pipeline<SqliteStore>> {
  let client = build_client(Duration::from_secs(config.http_timeout_secs))
    .context("failed to build HTTP client")?;

  let mut providers: Vec<Arc<dyn ProfileProvider>> = Vec::with_capacity(config.providers.len());
  for p in &config.providers {
    let endpoint = parse_endpoint(&format!("provider {}", p.name), &p.endpoint)?;
    providers.push(Arc::new(HttpDirectoryProvider::new(
      client.clone(),
      p.name.clone(),
      endpoint,
      p.api_key.clone(),
    )));
  }
  if providers.is_empty() {
    tracing::warn!("no profile providers configured; sourcing runs will find nothing");
  }

  let scorer = HttpScoringService::new(
    client.clone(),
    parse_endpoint("scoring", &config.scoring.endpoint)?,
    config.scoring.api_key.clone(),
  );
  let enrichment = HttpEnrichmentProvider::new(
    client,
    parse_endpoint("enrichment", &config.enrichment.endpoint)?,
    config.enrichment.api_key.clone(),
  );

  Ok(Pipeline::new(
    store,
    Collaborators {
      providers,
      scorer: Arc::new(scorer),
      enrichment: Arc::new(enrichment),
      guard: Arc::new(AllowAll),
    },
    PipelineConfig {
      enrichment:     config.enrichment.timing(),
      planner:        config.continuation.planner(),
      event_capacity: 0,
    },
  ))
}

/// The API under `/api`, with request tracing.
pub fn app(pipeline: Arc<Pipeline<SqliteStore>>) -> Router {
  Router::new()
    .nest("/api", sourcer_api::api_router(pipeline))
    .layer(TraceLayer::new_for_http())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/") {
    if let Ok(home) = std::env::var("HOME") {
      return PathBuf::from(home).join(rest);
    }
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests;
