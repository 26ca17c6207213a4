//! [`SqliteStore`]: the SQLite implementation of [`CandidateStore`].

use std::{
  collections::{HashMap, HashSet},
  path::Path,
};

use chrono::Utc;
use rusqlite::{OptionalExtension as _, types::Value as SqlValue};
use uuid::Uuid;

use sourcer_core::{
  candidate::{Candidate, ListedCandidate, NewCandidate, SearchCandidate, SearchCandidatePatch},
  search::{NewSearch, Search, SearchStatus, SourcingStrategy, StrategyStatus},
  store::{
    Attribution, CandidatePage, CandidateQuery, CandidateStore, NewLink, ScoringProgress, SortKey,
    encode_cursor,
  },
};

use crate::{
  Error, Result,
  encode::{
    CANDIDATE_COLUMNS, LINK_COLUMN_COUNT, LINK_COLUMNS, RawLink, RawProfile, RawSearch,
    RawStrategy, SEARCH_COLUMNS, STRATEGY_COLUMNS, decode_uuid, encode_dt, encode_json,
    encode_strings, encode_uuid, placeholders,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A candidate store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All clones
/// share one connection thread, which serialises every statement.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    tracing::debug!(path = %path.as_ref().display(), "opening store");
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn strategy_row(&self, id: Uuid) -> Result<Option<SourcingStrategy>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawStrategy> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {STRATEGY_COLUMNS} FROM strategies WHERE strategy_id = ?1"),
              rusqlite::params![id_str],
              RawStrategy::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawStrategy::into_strategy).transpose()
  }

  async fn link_row(&self, id: Uuid) -> Result<Option<SearchCandidate>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawLink> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {LINK_COLUMNS} FROM search_candidates sc
                 WHERE sc.search_candidate_id = ?1"
              ),
              rusqlite::params![id_str],
              RawLink::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawLink::into_link).transpose()
  }
}

/// Build the `WHERE` clause and parameters shared by the listing and count
/// queries.
fn listing_filter(query: &CandidateQuery) -> (String, Vec<SqlValue>) {
  let mut conds = vec!["sc.search_id = ?1".to_owned()];
  let mut params = vec![SqlValue::Text(encode_uuid(query.search_id))];

  if query.is_score_filtered() {
    conds.push("sc.match_score IS NOT NULL".to_owned());
  }
  if let Some(min) = query.score_min {
    params.push(SqlValue::Real(min));
    conds.push(format!("sc.match_score >= ?{}", params.len()));
  }
  if let Some(max) = query.score_max {
    params.push(SqlValue::Real(max));
    conds.push(format!("sc.match_score <= ?{}", params.len()));
  }

  (format!("WHERE {}", conds.join(" AND ")), params)
}

fn listing_order(sort: SortKey) -> &'static str {
  match sort {
    SortKey::DateAsc => "sc.created_at ASC, sc.rowid ASC",
    SortKey::DateDesc => "sc.created_at DESC, sc.rowid DESC",
    SortKey::ScoreAsc => {
      "sc.match_score IS NULL, sc.match_score ASC, sc.created_at ASC, sc.rowid ASC"
    }
    SortKey::ScoreDesc => {
      "sc.match_score IS NULL, sc.match_score DESC, sc.created_at DESC, sc.rowid DESC"
    }
  }
}

// ─── CandidateStore impl ─────────────────────────────────────────────────────

impl CandidateStore for SqliteStore {
  type Error = Error;

  // ── Searches ──────────────────────────────────────────────────────────────

  async fn create_search(&self, input: NewSearch) -> Result<Search> {
    let now = Utc::now();
    let search = Search {
      search_id:       Uuid::new_v4(),
      organization_id: input.organization_id,
      query_text:      input.query_text,
      criteria:        input.criteria,
      status:          SearchStatus::Created,
      progress:        0,
      created_at:      now,
      updated_at:      now,
    };

    let id_str       = encode_uuid(search.search_id);
    let org_str      = encode_uuid(search.organization_id);
    let query_text   = search.query_text.clone();
    let criteria_str = encode_json(&search.criteria);
    let status_str   = search.status.as_str();
    let at_str       = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO searches (
             search_id, organization_id, query_text, criteria_json,
             status, progress, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)",
          rusqlite::params![id_str, org_str, query_text, criteria_str, status_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(search)
  }

  async fn get_search(&self, id: Uuid) -> Result<Option<Search>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawSearch> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {SEARCH_COLUMNS} FROM searches WHERE search_id = ?1"),
              rusqlite::params![id_str],
              RawSearch::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawSearch::into_search).transpose()
  }

  async fn update_search_status(&self, id: Uuid, status: SearchStatus, progress: u8) -> Result<()> {
    let id_str     = encode_uuid(id);
    let status_str = status.as_str();
    let progress   = i64::from(progress.min(100));
    let at_str     = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE searches SET status = ?2, progress = ?3, updated_at = ?4 WHERE search_id = ?1",
          rusqlite::params![id_str, status_str, progress, at_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::SearchNotFound(id));
    }
    Ok(())
  }

  // ── Strategies ────────────────────────────────────────────────────────────

  async fn create_strategy(
    &self,
    search_id: Uuid,
    params: serde_json::Value,
  ) -> Result<SourcingStrategy> {
    if self.get_search(search_id).await?.is_none() {
      return Err(Error::SearchNotFound(search_id));
    }

    let now = Utc::now();
    let strategy = SourcingStrategy {
      strategy_id: Uuid::new_v4(),
      search_id,
      params,
      status: StrategyStatus::Pending,
      run_count: 0,
      created_at: now,
      updated_at: now,
    };

    let id_str     = encode_uuid(strategy.strategy_id);
    let search_str = encode_uuid(search_id);
    let params_str = encode_json(&strategy.params);
    let status_str = strategy.status.as_str();
    let at_str     = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO strategies (
             strategy_id, search_id, params_json, status, run_count, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)",
          rusqlite::params![id_str, search_str, params_str, status_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(strategy)
  }

  async fn get_strategy(&self, id: Uuid) -> Result<Option<SourcingStrategy>> {
    self.strategy_row(id).await
  }

  async fn list_strategies(&self, search_id: Uuid) -> Result<Vec<SourcingStrategy>> {
    let search_str = encode_uuid(search_id);
    let raws: Vec<RawStrategy> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {STRATEGY_COLUMNS} FROM strategies
           WHERE search_id = ?1
           ORDER BY created_at ASC, rowid ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![search_str], RawStrategy::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawStrategy::into_strategy).collect()
  }

  async fn start_strategy_run(&self, id: Uuid) -> Result<SourcingStrategy> {
    let before = self.strategy_row(id).await?.ok_or(Error::StrategyNotFound(id))?;

    let id_str     = encode_uuid(id);
    let status_str = StrategyStatus::Running.as_str();
    let at_str     = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE strategies
           SET status = ?2, run_count = run_count + 1, updated_at = ?3
           WHERE strategy_id = ?1",
          rusqlite::params![id_str, status_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(before)
  }

  async fn finish_strategy_run(&self, id: Uuid, status: StrategyStatus) -> Result<()> {
    let id_str     = encode_uuid(id);
    let status_str = status.as_str();
    let at_str     = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE strategies SET status = ?2, updated_at = ?3 WHERE strategy_id = ?1",
          rusqlite::params![id_str, status_str, at_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::StrategyNotFound(id));
    }
    Ok(())
  }

  async fn existing_strategy_ids(&self, ids: Vec<Uuid>) -> Result<HashSet<Uuid>> {
    if ids.is_empty() {
      return Ok(HashSet::new());
    }
    let id_strs: Vec<String> = ids.into_iter().map(encode_uuid).collect();

    let found: Vec<String> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT strategy_id FROM strategies WHERE strategy_id IN ({})",
          placeholders(1, id_strs.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(id_strs.iter()), |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    found.iter().map(|s| decode_uuid(s)).collect()
  }

  async fn strategy_scores(&self, search_id: Uuid) -> Result<Vec<(Uuid, f64)>> {
    let search_str = encode_uuid(search_id);
    let rows: Vec<(String, f64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT a.strategy_id, sc.match_score
           FROM strategy_attributions a
           JOIN search_candidates sc ON sc.search_candidate_id = a.search_candidate_id
           WHERE sc.search_id = ?1 AND sc.match_score IS NOT NULL",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![search_str], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(id, score)| Ok((decode_uuid(&id)?, score)))
      .collect()
  }

  // ── Candidates ────────────────────────────────────────────────────────────

  async fn find_candidates_by_url(&self, urls: Vec<String>) -> Result<HashMap<String, Uuid>> {
    if urls.is_empty() {
      return Ok(HashMap::new());
    }

    let rows: Vec<(String, String)> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT profile_url, candidate_id FROM candidates WHERE profile_url IN ({})",
          placeholders(1, urls.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(urls.iter()), |row| {
            Ok((row.get(0)?, row.get(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(url, id)| Ok((url, decode_uuid(&id)?)))
      .collect()
  }

  async fn insert_candidates(&self, candidates: Vec<NewCandidate>) -> Result<Vec<Candidate>> {
    if candidates.is_empty() {
      return Ok(Vec::new());
    }

    let now = Utc::now();
    let rows: Vec<Candidate> = candidates
      .into_iter()
      .map(|c| Candidate {
        candidate_id: Uuid::new_v4(),
        profile_url:  c.profile_url,
        full_name:    c.full_name,
        headline:     c.headline,
        location:     c.location,
        experience:   c.experience,
        education:    c.education,
        skills:       c.skills,
        emails:       Vec::new(),
        phones:       Vec::new(),
        created_at:   now,
        updated_at:   now,
      })
      .collect();

    let encoded: Vec<[Option<String>; 9]> = rows
      .iter()
      .map(|c| {
        [
          Some(encode_uuid(c.candidate_id)),
          Some(c.profile_url.clone()),
          c.full_name.clone(),
          c.headline.clone(),
          c.location.clone(),
          Some(encode_json(&c.experience)),
          Some(encode_json(&c.education)),
          Some(encode_json(&c.skills)),
          Some(encode_dt(c.created_at)),
        ]
      })
      .collect();

    // One transaction for the whole batch. A URL inserted concurrently by
    // another writer is skipped rather than failing the batch.
    let inserted: Vec<bool> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut inserted = Vec::with_capacity(encoded.len());
        {
          let mut stmt = tx.prepare(
            "INSERT INTO candidates (
               candidate_id, profile_url, full_name, headline, location,
               experience_json, education_json, skills_json, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
             ON CONFLICT (profile_url) DO NOTHING",
          )?;
          for row in &encoded {
            inserted.push(stmt.execute(rusqlite::params_from_iter(row.iter()))? == 1);
          }
        }
        tx.commit()?;
        Ok(inserted)
      })
      .await?;

    let skipped = inserted.iter().filter(|ok| !**ok).count();
    if skipped > 0 {
      tracing::debug!(skipped, "candidate urls already present; insert skipped");
    }

    Ok(
      rows
        .into_iter()
        .zip(inserted)
        .filter_map(|(c, ok)| ok.then_some(c))
        .collect(),
    )
  }

  async fn update_candidate(&self, id: Uuid, candidate: NewCandidate) -> Result<()> {
    let id_str         = encode_uuid(id);
    let experience_str = encode_json(&candidate.experience);
    let education_str  = encode_json(&candidate.education);
    let skills_str     = encode_json(&candidate.skills);
    let at_str         = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE candidates SET
             profile_url = ?2, full_name = ?3, headline = ?4, location = ?5,
             experience_json = ?6, education_json = ?7, skills_json = ?8, updated_at = ?9
           WHERE candidate_id = ?1",
          rusqlite::params![
            id_str,
            candidate.profile_url,
            candidate.full_name,
            candidate.headline,
            candidate.location,
            experience_str,
            education_str,
            skills_str,
            at_str,
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::CandidateNotFound(id));
    }
    Ok(())
  }

  async fn get_candidate(&self, id: Uuid) -> Result<Option<Candidate>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {CANDIDATE_COLUMNS} FROM candidates c WHERE c.candidate_id = ?1"),
              rusqlite::params![id_str],
              |row| RawProfile::from_row(row, 0),
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawProfile::into_candidate).transpose()
  }

  async fn set_candidate_contacts(
    &self,
    id: Uuid,
    emails: Option<Vec<String>>,
    phones: Option<Vec<String>>,
  ) -> Result<()> {
    let id_str     = encode_uuid(id);
    let emails_str = emails.as_deref().map(encode_strings).transpose()?;
    let phones_str = phones.as_deref().map(encode_strings).transpose()?;
    let at_str     = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE candidates SET
             emails_json = COALESCE(?2, emails_json),
             phones_json = COALESCE(?3, phones_json),
             updated_at  = ?4
           WHERE candidate_id = ?1",
          rusqlite::params![id_str, emails_str, phones_str, at_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::CandidateNotFound(id));
    }
    Ok(())
  }

  // ── Links ─────────────────────────────────────────────────────────────────

  async fn find_links(
    &self,
    search_id: Uuid,
    candidate_ids: Vec<Uuid>,
  ) -> Result<HashMap<Uuid, Uuid>> {
    if candidate_ids.is_empty() {
      return Ok(HashMap::new());
    }
    let mut params: Vec<String> = vec![encode_uuid(search_id)];
    params.extend(candidate_ids.into_iter().map(encode_uuid));

    let rows: Vec<(String, String)> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT candidate_id, search_candidate_id FROM search_candidates
           WHERE search_id = ?1 AND candidate_id IN ({})",
          placeholders(2, params.len() - 1)
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok((row.get(0)?, row.get(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(candidate, link)| Ok((decode_uuid(&candidate)?, decode_uuid(&link)?)))
      .collect()
  }

  async fn insert_links(&self, search_id: Uuid, links: Vec<NewLink>) -> Result<Vec<SearchCandidate>> {
    if links.is_empty() {
      return Ok(Vec::new());
    }

    let now = Utc::now();
    let rows: Vec<SearchCandidate> = links
      .into_iter()
      .map(|l| SearchCandidate {
        search_candidate_id: Uuid::new_v4(),
        search_id,
        candidate_id: l.candidate_id,
        match_score: None,
        score_notes: None,
        status: Default::default(),
        notes: None,
        source: l.source,
        created_at: now,
        updated_at: now,
      })
      .collect();

    let encoded: Vec<[String; 6]> = rows
      .iter()
      .map(|l| {
        [
          encode_uuid(l.search_candidate_id),
          encode_uuid(l.search_id),
          encode_uuid(l.candidate_id),
          l.status.as_str().to_owned(),
          l.source.clone(),
          encode_dt(l.created_at),
        ]
      })
      .collect();

    let inserted: Vec<bool> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut inserted = Vec::with_capacity(encoded.len());
        {
          let mut stmt = tx.prepare(
            "INSERT INTO search_candidates (
               search_candidate_id, search_id, candidate_id, status, source,
               created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT (search_id, candidate_id) DO NOTHING",
          )?;
          for row in &encoded {
            inserted.push(stmt.execute(rusqlite::params_from_iter(row.iter()))? == 1);
          }
        }
        tx.commit()?;
        Ok(inserted)
      })
      .await?;

    Ok(
      rows
        .into_iter()
        .zip(inserted)
        .filter_map(|(l, ok)| ok.then_some(l))
        .collect(),
    )
  }

  async fn insert_attributions(&self, attributions: Vec<Attribution>) -> Result<usize> {
    if attributions.is_empty() {
      return Ok(0);
    }
    let at_str = encode_dt(Utc::now());
    let encoded: Vec<(String, String)> = attributions
      .iter()
      .map(|a| (encode_uuid(a.search_candidate_id), encode_uuid(a.strategy_id)))
      .collect();

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
          let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO strategy_attributions
               (search_candidate_id, strategy_id, created_at)
             VALUES (?1, ?2, ?3)",
          )?;
          for (link, strategy) in &encoded {
            inserted += stmt.execute(rusqlite::params![link, strategy, at_str])?;
          }
        }
        tx.commit()?;
        Ok(inserted)
      })
      .await?;

    Ok(inserted)
  }

  async fn get_search_candidate(&self, id: Uuid) -> Result<Option<SearchCandidate>> {
    self.link_row(id).await
  }

  async fn update_search_candidate(
    &self,
    id: Uuid,
    patch: SearchCandidatePatch,
  ) -> Result<SearchCandidate> {
    let id_str     = encode_uuid(id);
    let status_str = patch.status.map(|s| s.as_str());
    let notes      = patch.notes;
    let at_str     = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE search_candidates SET
             status     = COALESCE(?2, status),
             notes      = COALESCE(?3, notes),
             updated_at = ?4
           WHERE search_candidate_id = ?1",
          rusqlite::params![id_str, status_str, notes, at_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::SearchCandidateNotFound(id));
    }
    self.link_row(id).await?.ok_or(Error::SearchCandidateNotFound(id))
  }

  async fn record_score(&self, id: Uuid, score: f64, notes: serde_json::Value) -> Result<()> {
    let id_str    = encode_uuid(id);
    let score     = score.clamp(0.0, 100.0);
    let notes_str = encode_json(&notes);
    let at_str    = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE search_candidates
           SET match_score = ?2, score_notes_json = ?3, updated_at = ?4
           WHERE search_candidate_id = ?1",
          rusqlite::params![id_str, score, notes_str, at_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::SearchCandidateNotFound(id));
    }
    Ok(())
  }

  async fn unscored_search_candidate_ids(&self, search_id: Uuid) -> Result<Vec<Uuid>> {
    let search_str = encode_uuid(search_id);
    let ids: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT search_candidate_id FROM search_candidates
           WHERE search_id = ?1 AND match_score IS NULL
           ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![search_str], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;
    ids.iter().map(|s| decode_uuid(s)).collect()
  }

  async fn scoring_progress(&self, search_id: Uuid) -> Result<ScoringProgress> {
    let search_str = encode_uuid(search_id);
    let (total, scored): (i64, i64) = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*), COUNT(match_score) FROM search_candidates WHERE search_id = ?1",
          rusqlite::params![search_str],
          |row| Ok((row.get(0)?, row.get(1)?)),
        )?)
      })
      .await?;
    Ok(ScoringProgress::new(total.max(0) as u64, scored.max(0) as u64))
  }

  async fn list_candidates(&self, query: &CandidateQuery) -> Result<CandidatePage> {
    let (where_clause, mut params) = listing_filter(query);
    let order = listing_order(query.sort);
    let limit = query.page_size();
    let start = query.start();

    let count_sql = format!("SELECT COUNT(*) FROM search_candidates sc {where_clause}");
    let count_params = params.clone();
    params.push(SqlValue::Integer(limit as i64));
    let limit_idx = params.len();
    params.push(SqlValue::Integer(i64::try_from(start).unwrap_or(i64::MAX)));
    let offset_idx = params.len();
    let list_sql = format!(
      "SELECT {LINK_COLUMNS}, {CANDIDATE_COLUMNS}
       FROM search_candidates sc
       JOIN candidates c ON c.candidate_id = sc.candidate_id
       {where_clause}
       ORDER BY {order}
       LIMIT ?{limit_idx} OFFSET ?{offset_idx}"
    );

    let (total, raws): (i64, Vec<(RawLink, RawProfile)>) = self
      .conn
      .call(move |conn| {
        let total: i64 = conn.query_row(
          &count_sql,
          rusqlite::params_from_iter(count_params.iter()),
          |row| row.get(0),
        )?;
        let mut stmt = conn.prepare(&list_sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok((RawLink::from_row(row)?, RawProfile::from_row(row, LINK_COLUMN_COUNT)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((total, rows))
      })
      .await?;

    let items: Vec<ListedCandidate> = raws
      .into_iter()
      .map(|(link, profile)| {
        Ok(ListedCandidate { link: link.into_link()?, candidate: profile.into_candidate()? })
      })
      .collect::<Result<_>>()?;

    let total = total.max(0) as u64;
    let next_cursor = start
      .checked_add(items.len())
      .filter(|next| (*next as u64) < total && !items.is_empty())
      .map(encode_cursor);

    Ok(CandidatePage { items, total, next_cursor })
  }
}
