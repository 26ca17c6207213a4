//! Candidate Repository: normalise, deduplicate, persist and link a batch of
//! provider records.

use std::{
  collections::{HashMap, HashSet},
  sync::Arc,
};

use serde::Serialize;
use sourcer_core::{
  candidate::NewCandidate,
  store::{Attribution, CandidateStore, NewLink},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  aggregator::SourcedRecord,
  error::{RepositoryError, store_err},
};

/// Counts reported by [`CandidateRepository::persist`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PersistReport {
  /// Candidates inserted for the first time.
  pub saved:          usize,
  /// Known candidates whose profile was overwritten.
  pub updated:        usize,
  pub failed_updates: usize,
  /// Links created by this batch.
  pub linked:         usize,
  /// Attribution rows created by this batch.
  pub attributed:     usize,
  /// Records without a usable profile URL.
  pub dropped:        usize,
}

pub struct CandidateRepository<S> {
  store: Arc<S>,
}

impl<S> Clone for CandidateRepository<S> {
  fn clone(&self) -> Self { Self { store: self.store.clone() } }
}

impl<S: CandidateStore> CandidateRepository<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Persist `records` for `search_id` and attribute every resulting link to
  /// each of `strategy_ids` that exists.
  ///
  /// The existence check and the insert must succeed; everything after them
  /// degrades to smaller counts instead of failing the batch.
  pub async fn persist(
    &self,
    search_id: Uuid,
    records: &[SourcedRecord],
    strategy_ids: &[Uuid],
  ) -> Result<PersistReport, RepositoryError> {
    let mut report = PersistReport::default();

    // Normalise and collapse duplicates; the last record for a URL wins.
    let mut batch: Vec<NewCandidate> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for sourced in records {
      let Some(candidate) = sourced.record.normalize(&sourced.source) else {
        report.dropped += 1;
        continue;
      };
      match positions.get(&candidate.profile_url) {
        Some(&i) => batch[i] = candidate,
        None => {
          positions.insert(candidate.profile_url.clone(), batch.len());
          batch.push(candidate);
        }
      }
    }
    if batch.is_empty() {
      debug!(%search_id, dropped = report.dropped, "nothing to persist");
      return Ok(report);
    }

    let urls: Vec<String> = batch.iter().map(|c| c.profile_url.clone()).collect();
    let sources: HashMap<String, String> =
      batch.iter().map(|c| (c.profile_url.clone(), c.source.clone())).collect();

    let mut ids = self
      .store
      .find_candidates_by_url(urls.clone())
      .await
      .map_err(|e| RepositoryError::Store(store_err(e)))?;

    let (updates, inserts): (Vec<NewCandidate>, Vec<NewCandidate>) =
      batch.into_iter().partition(|c| ids.contains_key(&c.profile_url));

    let inserted = self
      .store
      .insert_candidates(inserts)
      .await
      .map_err(|e| RepositoryError::Store(store_err(e)))?;
    report.saved = inserted.len();
    ids.extend(inserted.into_iter().map(|c| (c.profile_url, c.candidate_id)));

    // One at a time, in batch order.
    for candidate in updates {
      let Some(&id) = ids.get(&candidate.profile_url) else { continue };
      match self.store.update_candidate(id, candidate).await {
        Ok(()) => report.updated += 1,
        Err(e) => {
          warn!(%search_id, candidate_id = %id, error = %e, "candidate update failed; skipping");
          report.failed_updates += 1;
        }
      }
    }

    // Rows skipped by the insert because another writer got there first.
    let missing: Vec<String> = urls.iter().filter(|u| !ids.contains_key(*u)).cloned().collect();
    if !missing.is_empty() {
      match self.store.find_candidates_by_url(missing).await {
        Ok(found) => ids.extend(found),
        Err(e) => warn!(%search_id, error = %e, "could not resolve concurrently inserted candidates"),
      }
    }

    let candidate_ids: Vec<Uuid> = urls.iter().filter_map(|u| ids.get(u).copied()).collect();
    let link_ids = self.link(search_id, &candidate_ids, &ids, &sources, &mut report).await;
    report.attributed = self.attribute(search_id, &link_ids, strategy_ids).await;

    info!(
      %search_id,
      saved = report.saved,
      updated = report.updated,
      failed_updates = report.failed_updates,
      linked = report.linked,
      attributed = report.attributed,
      dropped = report.dropped,
      "persisted candidate batch"
    );
    Ok(report)
  }

  /// Link every candidate not already linked to the search. Returns the ids
  /// of all links (old and new) that could be resolved.
  async fn link(
    &self,
    search_id: Uuid,
    candidate_ids: &[Uuid],
    ids_by_url: &HashMap<String, Uuid>,
    sources: &HashMap<String, String>,
    report: &mut PersistReport,
  ) -> Vec<Uuid> {
    let existing = match self.store.find_links(search_id, candidate_ids.to_vec()).await {
      Ok(existing) => existing,
      Err(e) => {
        warn!(%search_id, error = %e, "link lookup failed; candidates left unlinked");
        return Vec::new();
      }
    };

    let source_of: HashMap<Uuid, &String> = ids_by_url
      .iter()
      .filter_map(|(url, id)| sources.get(url).map(|s| (*id, s)))
      .collect();
    let new_links: Vec<NewLink> = candidate_ids
      .iter()
      .filter(|id| !existing.contains_key(*id))
      .map(|id| NewLink {
        candidate_id: *id,
        source:       source_of.get(id).map(|s| s.to_string()).unwrap_or_default(),
      })
      .collect();

    let mut link_ids: Vec<Uuid> = existing.into_values().collect();
    match self.store.insert_links(search_id, new_links).await {
      Ok(created) => {
        report.linked = created.len();
        link_ids.extend(created.into_iter().map(|l| l.search_candidate_id));
      }
      Err(e) => warn!(%search_id, error = %e, "link insert failed; retry later"),
    }
    link_ids
  }

  /// Attribute links to the strategies among `strategy_ids` that exist.
  async fn attribute(&self, search_id: Uuid, link_ids: &[Uuid], strategy_ids: &[Uuid]) -> usize {
    if link_ids.is_empty() || strategy_ids.is_empty() {
      return 0;
    }
    let requested: Vec<Uuid> = strategy_ids
      .iter()
      .copied()
      .collect::<HashSet<_>>()
      .into_iter()
      .collect();

    let known = match self.store.existing_strategy_ids(requested.clone()).await {
      Ok(known) => known,
      Err(e) => {
        warn!(%search_id, error = %e, "strategy lookup failed; skipping attribution");
        return 0;
      }
    };
    if known.len() < requested.len() {
      debug!(%search_id, dropped = requested.len() - known.len(), "ignoring unknown strategy ids");
    }

    let rows: Vec<Attribution> = link_ids
      .iter()
      .flat_map(|link| {
        known
          .iter()
          .map(move |strategy| Attribution { search_candidate_id: *link, strategy_id: *strategy })
      })
      .collect();
    match self.store.insert_attributions(rows).await {
      Ok(n) => n,
      Err(e) => {
        warn!(%search_id, error = %e, "attribution insert failed");
        0
      }
    }
  }
}
