use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  body::Body,
  http::{Request, StatusCode},
};
use sourcer_store_sqlite::SqliteStore;
use tower::ServiceExt;

use super::*;

fn parse(toml: &str) -> ServerConfig {
  config::Config::builder()
    .add_source(config::File::from_str(toml, config::FileFormat::Toml))
    .build()
    .unwrap()
    .try_deserialize()
    .unwrap()
}

const MINIMAL: &str = r#"
[scoring]
endpoint = "https://scoring.internal/v1/score"

[enrichment]
endpoint = "https://enrich.internal/v1/jobs"
"#;

#[test]
fn minimal_config_takes_defaults() {
  let cfg = parse(MINIMAL);
  assert_eq!(cfg.host, "127.0.0.1");
  assert_eq!(cfg.port, 8080);
  assert_eq!(cfg.http_timeout_secs, 30);
  assert!(cfg.providers.is_empty());
  assert!(cfg.enrichment.api_key.is_none());

  let timing = cfg.enrichment.timing();
  assert_eq!(timing.warmup, Duration::from_millis(1500));
  assert_eq!(timing.poll_interval, Duration::from_millis(1000));
  assert_eq!(timing.max_attempts, 60);

  let planner = cfg.continuation.planner();
  assert_eq!((planner.target_candidates, planner.candidates_per_run, planner.max_strategies), (150, 25, 6));
}

#[test]
fn full_config_overrides_defaults() {
  let cfg = parse(
    r#"
port = 9100
store_path = "/var/lib/sourcer/db.sqlite"

[[providers]]
name = "directory"
endpoint = "https://people.example.com/search"
api_key = "k1"

[[providers]]
name = "scraper"
endpoint = "https://scrape.example.com/run"

[scoring]
endpoint = "https://scoring.internal/v1/score"

[enrichment]
endpoint = "https://enrich.internal/v1/jobs"
api_key = "secret"
max_attempts = 10

[continuation]
target_candidates = 60
"#,
  );
  assert_eq!(cfg.port, 9100);
  assert_eq!(cfg.store_path, PathBuf::from("/var/lib/sourcer/db.sqlite"));
  assert_eq!(cfg.providers.len(), 2);
  assert_eq!(cfg.providers[1].api_key, None);
  assert_eq!(cfg.enrichment.timing().max_attempts, 10);
  assert_eq!(cfg.continuation.target_candidates, 60);
  assert_eq!(cfg.continuation.candidates_per_run, 25);
}

#[test]
fn tilde_expands_against_home() {
  let Ok(home) = std::env::var("HOME") else { return };
  assert_eq!(expand_tilde(Path::new("~/data/db")), PathBuf::from(home).join("data/db"));
  assert_eq!(expand_tilde(Path::new("/abs/db")), PathBuf::from("/abs/db"));
}

#[tokio::test]
async fn invalid_endpoint_is_a_startup_error() {
  let mut cfg = parse(MINIMAL);
  cfg.scoring.endpoint = "not a url".into();
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let err = build_pipeline(&cfg, store).err().unwrap();
  assert!(err.to_string().contains("scoring"), "{err}");
}

#[tokio::test]
async fn api_is_mounted_under_prefix() {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let pipeline = build_pipeline(&parse(MINIMAL), store).unwrap();
  let router = app(Arc::new(pipeline));

  let req = Request::builder()
    .uri(format!("/api/searches/{}", uuid_nil()))
    .body(Body::empty())
    .unwrap();
  let resp = router.clone().oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);

  let req = Request::builder().uri("/searches").body(Body::empty()).unwrap();
  let resp = router.oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

fn uuid_nil() -> &'static str { "00000000-0000-0000-0000-000000000000" }
