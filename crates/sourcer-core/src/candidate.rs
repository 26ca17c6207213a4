//! Candidates and their per-search links.
//!
//! A [`Candidate`] is a canonical person profile shared by every search that
//! discovers it; identity is the canonical profile URL. A [`SearchCandidate`]
//! is the join row carrying everything that is specific to one search: the
//! match score, the review status and recruiter notes.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

// ─── Candidate ───────────────────────────────────────────────────────────────

/// A normalised profile ready to be inserted or to overwrite an existing row.
///
/// Sub-sections are copied verbatim from the provider payload and stored as
/// opaque JSON blobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCandidate {
  /// Canonical profile URL; the uniqueness key.
  pub profile_url: String,
  pub full_name:   Option<String>,
  pub headline:    Option<String>,
  pub location:    Option<String>,
  pub experience:  serde_json::Value,
  pub education:   serde_json::Value,
  pub skills:      serde_json::Value,
  /// Tag of the provider that returned this record.
  pub source:      String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
  pub candidate_id: Uuid,
  pub profile_url:  String,
  pub full_name:    Option<String>,
  pub headline:     Option<String>,
  pub location:     Option<String>,
  pub experience:   serde_json::Value,
  pub education:    serde_json::Value,
  pub skills:       serde_json::Value,
  /// Revealed by enrichment; empty until then.
  pub emails:       Vec<String>,
  pub phones:       Vec<String>,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

impl Candidate {
  /// The profile document handed to the scoring capability.
  pub fn profile(&self) -> serde_json::Value {
    serde_json::json!({
      "profile_url": self.profile_url,
      "full_name":   self.full_name,
      "headline":    self.headline,
      "location":    self.location,
      "experience":  self.experience,
      "education":   self.education,
      "skills":      self.skills,
    })
  }
}

// ─── Review status ───────────────────────────────────────────────────────────

/// Recruiter-facing pipeline status of a candidate within one search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateStatus {
  #[default]
  New,
  Reviewing,
  Contacted,
  Rejected,
  Hired,
}

impl CandidateStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::New => "new",
      Self::Reviewing => "reviewing",
      Self::Contacted => "contacted",
      Self::Rejected => "rejected",
      Self::Hired => "hired",
    }
  }
}

impl FromStr for CandidateStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "new" => Ok(Self::New),
      "reviewing" => Ok(Self::Reviewing),
      "contacted" => Ok(Self::Contacted),
      "rejected" => Ok(Self::Rejected),
      "hired" => Ok(Self::Hired),
      other => Err(Error::UnknownCandidateStatus(other.to_owned())),
    }
  }
}

// ─── SearchCandidate ─────────────────────────────────────────────────────────

/// Link between a search and a candidate. At most one per pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchCandidate {
  pub search_candidate_id: Uuid,
  pub search_id:           Uuid,
  pub candidate_id:        Uuid,
  /// `None` until scored.
  pub match_score:         Option<f64>,
  /// Structured explanation returned alongside the score.
  pub score_notes:         Option<serde_json::Value>,
  pub status:              CandidateStatus,
  pub notes:               Option<String>,
  pub source:              String,
  pub created_at:          DateTime<Utc>,
  pub updated_at:          DateTime<Utc>,
}

/// A link bundled with its candidate, as returned by listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListedCandidate {
  #[serde(flatten)]
  pub link:      SearchCandidate,
  pub candidate: Candidate,
}

/// Partial update for a [`SearchCandidate`]; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchCandidatePatch {
  pub status: Option<CandidateStatus>,
  pub notes:  Option<String>,
}
