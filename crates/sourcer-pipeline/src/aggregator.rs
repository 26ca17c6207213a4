//! Source Aggregator: concurrent fan-out over every registered provider.

use std::{collections::HashMap, sync::Arc};

use futures::future::join_all;
use sourcer_core::{
  provider::{ProfileProvider, SourceQuery},
  raw::RawCandidate,
};
use tracing::{debug, info, warn};

/// One provider record together with the provider that returned it.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcedRecord {
  pub source: String,
  pub record: RawCandidate,
}

/// Queries every provider in parallel. A failing provider contributes nothing
/// and never fails the others.
#[derive(Clone, Default)]
pub struct SourceAggregator {
  providers: Vec<Arc<dyn ProfileProvider>>,
}

impl SourceAggregator {
  pub fn new(providers: Vec<Arc<dyn ProfileProvider>>) -> Self { Self { providers } }

  pub fn provider_count(&self) -> usize { self.providers.len() }

  /// Raw results of every provider that answered, in registration order.
  async fn fan_out(&self, query: &SourceQuery) -> Vec<(String, Vec<RawCandidate>)> {
    let calls = self.providers.iter().map(|provider| async move {
      let name = provider.name().to_owned();
      match provider.search(query).await {
        Ok(records) => {
          debug!(provider = %name, count = records.len(), "provider answered");
          (name, records)
        }
        Err(e) => {
          warn!(provider = %name, error = %e, "provider search failed; contributing no results");
          (name, Vec::new())
        }
      }
    });
    join_all(calls).await
  }

  /// Deduplicated canonical profile URLs, in first-seen order.
  pub async fn search_urls(&self, query: &SourceQuery) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let urls: Vec<String> = self
      .fan_out(query)
      .await
      .into_iter()
      .flat_map(|(_, records)| records)
      .filter_map(|record| record.canonical_url())
      .filter(|url| seen.insert(url.clone()))
      .collect();
    info!(providers = self.providers.len(), page = query.page, urls = urls.len(), "sourced profiles");
    urls
  }

  /// Full records, deduplicated by canonical URL.
  ///
  /// When several records share a URL the last one wins, but the record keeps
  /// the position where its URL was first seen. Records without a usable URL
  /// are dropped.
  pub async fn search_records(&self, query: &SourceQuery) -> Vec<SourcedRecord> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<SourcedRecord> = Vec::new();

    for (source, records) in self.fan_out(query).await {
      for record in records {
        let Some(url) = record.canonical_url() else {
          debug!(provider = %source, "dropping record without a profile url");
          continue;
        };
        let sourced = SourcedRecord { source: source.clone(), record };
        match positions.get(&url) {
          Some(&i) => out[i] = sourced,
          None => {
            positions.insert(url, out.len());
            out.push(sourced);
          }
        }
      }
    }

    info!(providers = self.providers.len(), page = query.page, records = out.len(), "sourced records");
    out
  }
}
