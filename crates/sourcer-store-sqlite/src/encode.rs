//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings (microsecond
//! precision) so that lexical order is chronological order. Opaque sub-documents
//! are stored as compact JSON. UUIDs are stored as hyphenated lowercase
//! strings.

use chrono::{DateTime, SecondsFormat, Utc};
use sourcer_core::{
  candidate::{Candidate, CandidateStatus, SearchCandidate},
  search::{Search, SearchStatus, SourcingStrategy, StrategyStatus},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_json(v: &serde_json::Value) -> String { v.to_string() }

/// Decode a stored JSON column. Text that is not valid JSON is kept as a JSON
/// string so callers can decide what an unreadable document means.
pub fn decode_json_lenient(s: &str) -> serde_json::Value {
  serde_json::from_str(s).unwrap_or_else(|_| serde_json::Value::String(s.to_owned()))
}

pub fn encode_strings(values: &[String]) -> Result<String> { Ok(serde_json::to_string(values)?) }

pub fn decode_strings(s: &str) -> Result<Vec<String>> { Ok(serde_json::from_str(s)?) }

/// `?1, ?2, ... ?n` starting at `first`.
pub fn placeholders(first: usize, n: usize) -> String {
  (first..first + n).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ")
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const SEARCH_COLUMNS: &str =
  "search_id, organization_id, query_text, criteria_json, status, progress, created_at, updated_at";

/// Raw strings read directly from a `searches` row.
pub struct RawSearch {
  pub search_id:       String,
  pub organization_id: String,
  pub query_text:      String,
  pub criteria_json:   String,
  pub status:          String,
  pub progress:        i64,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawSearch {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      search_id:       row.get(0)?,
      organization_id: row.get(1)?,
      query_text:      row.get(2)?,
      criteria_json:   row.get(3)?,
      status:          row.get(4)?,
      progress:        row.get(5)?,
      created_at:      row.get(6)?,
      updated_at:      row.get(7)?,
    })
  }

  pub fn into_search(self) -> Result<Search> {
    Ok(Search {
      search_id:       decode_uuid(&self.search_id)?,
      organization_id: decode_uuid(&self.organization_id)?,
      query_text:      self.query_text,
      criteria:        decode_json_lenient(&self.criteria_json),
      status:          self.status.parse::<SearchStatus>()?,
      progress:        self.progress.clamp(0, 100) as u8,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

pub const STRATEGY_COLUMNS: &str =
  "strategy_id, search_id, params_json, status, run_count, created_at, updated_at";

/// Raw strings read directly from a `strategies` row.
pub struct RawStrategy {
  pub strategy_id: String,
  pub search_id:   String,
  pub params_json: String,
  pub status:      String,
  pub run_count:   i64,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawStrategy {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      strategy_id: row.get(0)?,
      search_id:   row.get(1)?,
      params_json: row.get(2)?,
      status:      row.get(3)?,
      run_count:   row.get(4)?,
      created_at:  row.get(5)?,
      updated_at:  row.get(6)?,
    })
  }

  pub fn into_strategy(self) -> Result<SourcingStrategy> {
    Ok(SourcingStrategy {
      strategy_id: decode_uuid(&self.strategy_id)?,
      search_id:   decode_uuid(&self.search_id)?,
      params:      decode_json_lenient(&self.params_json),
      status:      self.status.parse::<StrategyStatus>()?,
      run_count:   self.run_count.max(0) as u32,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

pub const CANDIDATE_COLUMNS: &str = "c.candidate_id, c.profile_url, c.full_name, c.headline, \
   c.location, c.experience_json, c.education_json, c.skills_json, c.emails_json, \
   c.phones_json, c.created_at, c.updated_at";

/// Raw strings read directly from a `candidates` row.
pub struct RawProfile {
  pub candidate_id:    String,
  pub profile_url:     String,
  pub full_name:       Option<String>,
  pub headline:        Option<String>,
  pub location:        Option<String>,
  pub experience_json: String,
  pub education_json:  String,
  pub skills_json:     String,
  pub emails_json:     String,
  pub phones_json:     String,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawProfile {
  /// Read [`CANDIDATE_COLUMNS`] starting at column `at`.
  pub fn from_row(row: &rusqlite::Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      candidate_id:    row.get(at)?,
      profile_url:     row.get(at + 1)?,
      full_name:       row.get(at + 2)?,
      headline:        row.get(at + 3)?,
      location:        row.get(at + 4)?,
      experience_json: row.get(at + 5)?,
      education_json:  row.get(at + 6)?,
      skills_json:     row.get(at + 7)?,
      emails_json:     row.get(at + 8)?,
      phones_json:     row.get(at + 9)?,
      created_at:      row.get(at + 10)?,
      updated_at:      row.get(at + 11)?,
    })
  }

  pub fn into_candidate(self) -> Result<Candidate> {
    Ok(Candidate {
      candidate_id: decode_uuid(&self.candidate_id)?,
      profile_url:  self.profile_url,
      full_name:    self.full_name,
      headline:     self.headline,
      location:     self.location,
      experience:   decode_json_lenient(&self.experience_json),
      education:    decode_json_lenient(&self.education_json),
      skills:       decode_json_lenient(&self.skills_json),
      emails:       decode_strings(&self.emails_json)?,
      phones:       decode_strings(&self.phones_json)?,
      created_at:   decode_dt(&self.created_at)?,
      updated_at:   decode_dt(&self.updated_at)?,
    })
  }
}

pub const LINK_COLUMNS: &str = "sc.search_candidate_id, sc.search_id, sc.candidate_id, \
   sc.match_score, sc.score_notes_json, sc.status, sc.notes, sc.source, sc.created_at, \
   sc.updated_at";

/// Number of columns in [`LINK_COLUMNS`].
pub const LINK_COLUMN_COUNT: usize = 10;

/// Raw strings read directly from a `search_candidates` row.
pub struct RawLink {
  pub search_candidate_id: String,
  pub search_id:           String,
  pub candidate_id:        String,
  pub match_score:         Option<f64>,
  pub score_notes_json:    Option<String>,
  pub status:              String,
  pub notes:               Option<String>,
  pub source:              String,
  pub created_at:          String,
  pub updated_at:          String,
}

impl RawLink {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      search_candidate_id: row.get(0)?,
      search_id:           row.get(1)?,
      candidate_id:        row.get(2)?,
      match_score:         row.get(3)?,
      score_notes_json:    row.get(4)?,
      status:              row.get(5)?,
      notes:               row.get(6)?,
      source:              row.get(7)?,
      created_at:          row.get(8)?,
      updated_at:          row.get(9)?,
    })
  }

  pub fn into_link(self) -> Result<SearchCandidate> {
    Ok(SearchCandidate {
      search_candidate_id: decode_uuid(&self.search_candidate_id)?,
      search_id:           decode_uuid(&self.search_id)?,
      candidate_id:        decode_uuid(&self.candidate_id)?,
      match_score:         self.match_score,
      score_notes:         self.score_notes_json.as_deref().map(decode_json_lenient),
      status:              self.status.parse::<CandidateStatus>()?,
      notes:               self.notes,
      source:              self.source,
      created_at:          decode_dt(&self.created_at)?,
      updated_at:          decode_dt(&self.updated_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let a = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let b = Utc.timestamp_opt(1_700_000_000, 500_000_000).unwrap();
    let c = Utc.timestamp_opt(1_700_000_001, 0).unwrap();
    assert!(encode_dt(a) < encode_dt(b));
    assert!(encode_dt(b) < encode_dt(c));
    assert_eq!(decode_dt(&encode_dt(b)).unwrap(), b);
  }

  #[test]
  fn unreadable_json_is_kept_as_string() {
    assert_eq!(decode_json_lenient("{\"a\":1}"), serde_json::json!({ "a": 1 }));
    assert_eq!(decode_json_lenient("{oops"), serde_json::Value::String("{oops".into()));
  }

  #[test]
  fn placeholders_are_numbered() {
    assert_eq!(placeholders(2, 3), "?2, ?3, ?4");
  }
}
