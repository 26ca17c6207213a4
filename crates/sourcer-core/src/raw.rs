//! Raw provider payloads and their normalisation into [`NewCandidate`].
//!
//! Providers do not agree on a schema. Known shapes are modelled as typed
//! variants; anything else falls through to a bag of fields, from which values
//! are extracted by trying field names in a fixed priority order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{candidate::NewCandidate, profile_url::try_canonicalize};

// ─── Known shapes ────────────────────────────────────────────────────────────

/// Person-directory shape: snake_case, one `profile_url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryRecord {
  pub profile_url: String,
  #[serde(default)]
  pub full_name:   Option<String>,
  #[serde(default)]
  pub headline:    Option<String>,
  #[serde(default)]
  pub location:    Option<String>,
  #[serde(default)]
  pub experience:  Value,
  #[serde(default)]
  pub education:   Value,
  #[serde(default)]
  pub skills:      Value,
}

/// Profile-scraper shape: camelCase with split names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedRecord {
  pub linkedin_url: String,
  #[serde(default)]
  pub first_name:   Option<String>,
  #[serde(default)]
  pub last_name:    Option<String>,
  #[serde(default)]
  pub headline:     Option<String>,
  #[serde(default)]
  pub location:     Option<String>,
  #[serde(default)]
  pub experiences:  Value,
  #[serde(default)]
  pub educations:   Value,
  #[serde(default)]
  pub skills:       Value,
}

// ─── Tagged union ────────────────────────────────────────────────────────────

/// One record as returned by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCandidate {
  Directory(DirectoryRecord),
  Scraped(ScrapedRecord),
  /// Fallback for unrecognised payloads.
  Fields(Map<String, Value>),
}

const URL_KEYS: &[&str] = &[
  "profile_url",
  "profileUrl",
  "linkedin_url",
  "linkedinUrl",
  "public_profile_url",
  "publicProfileUrl",
  "url",
];
const NAME_KEYS: &[&str] = &["full_name", "fullName", "name"];
const FIRST_NAME_KEYS: &[&str] = &["first_name", "firstName"];
const LAST_NAME_KEYS: &[&str] = &["last_name", "lastName"];
const HEADLINE_KEYS: &[&str] = &["headline", "title", "job_title", "occupation"];
const LOCATION_KEYS: &[&str] = &["location", "location_name", "locationName", "city"];
const EXPERIENCE_KEYS: &[&str] = &["experience", "experiences", "positions", "work_history"];
const EDUCATION_KEYS: &[&str] = &["education", "educations", "schools"];
const SKILL_KEYS: &[&str] = &["skills"];

impl RawCandidate {
  /// The canonical profile URL of this record, if it has a usable one.
  pub fn canonical_url(&self) -> Option<String> {
    match self {
      Self::Directory(r) => try_canonicalize(&r.profile_url),
      Self::Scraped(r) => try_canonicalize(&r.linkedin_url),
      Self::Fields(map) => URL_KEYS
        .iter()
        .filter_map(|k| map.get(*k).and_then(Value::as_str))
        .find_map(try_canonicalize),
    }
  }

  /// Normalise into the canonical candidate shape. Records without a usable
  /// profile URL yield `None`.
  pub fn normalize(&self, source: &str) -> Option<NewCandidate> {
    let profile_url = self.canonical_url()?;
    let candidate = match self {
      Self::Directory(r) => NewCandidate {
        profile_url,
        full_name: non_empty(r.full_name.as_deref()),
        headline: non_empty(r.headline.as_deref()),
        location: non_empty(r.location.as_deref()),
        experience: r.experience.clone(),
        education: r.education.clone(),
        skills: r.skills.clone(),
        source: source.to_owned(),
      },
      Self::Scraped(r) => NewCandidate {
        profile_url,
        full_name: join_names(r.first_name.as_deref(), r.last_name.as_deref()),
        headline: non_empty(r.headline.as_deref()),
        location: non_empty(r.location.as_deref()),
        experience: r.experiences.clone(),
        education: r.educations.clone(),
        skills: r.skills.clone(),
        source: source.to_owned(),
      },
      Self::Fields(map) => NewCandidate {
        profile_url,
        full_name: first_str(map, NAME_KEYS).or_else(|| {
          join_names(
            first_str(map, FIRST_NAME_KEYS).as_deref(),
            first_str(map, LAST_NAME_KEYS).as_deref(),
          )
        }),
        headline: first_str(map, HEADLINE_KEYS),
        location: first_str(map, LOCATION_KEYS),
        experience: first_value(map, EXPERIENCE_KEYS),
        education: first_value(map, EDUCATION_KEYS),
        skills: first_value(map, SKILL_KEYS),
        source: source.to_owned(),
      },
    };
    Some(candidate)
  }
}

// ─── Extraction helpers ──────────────────────────────────────────────────────

fn non_empty(s: Option<&str>) -> Option<String> {
  s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned)
}

fn join_names(first: Option<&str>, last: Option<&str>) -> Option<String> {
  let parts: Vec<&str> = [first, last]
    .into_iter()
    .flatten()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .collect();
  if parts.is_empty() { None } else { Some(parts.join(" ")) }
}

/// First non-empty string among `keys`, in order.
pub fn first_str(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
  keys
    .iter()
    .filter_map(|k| map.get(*k).and_then(Value::as_str))
    .find_map(|s| non_empty(Some(s)))
}

/// First non-null value among `keys`, in order; `Null` if none.
fn first_value(map: &Map<String, Value>, keys: &[&str]) -> Value {
  keys
    .iter()
    .filter_map(|k| map.get(*k))
    .find(|v| !v.is_null())
    .cloned()
    .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn parse(v: Value) -> RawCandidate { serde_json::from_value(v).unwrap() }

  #[test]
  fn directory_shape_is_recognised() {
    let raw = parse(json!({
      "profile_url": "https://www.linkedin.com/in/ada/",
      "full_name": "Ada Lovelace",
      "headline": "Analyst",
      "skills": ["math"]
    }));
    assert!(matches!(raw, RawCandidate::Directory(_)));

    let c = raw.normalize("directory").unwrap();
    assert_eq!(c.profile_url, "https://www.linkedin.com/in/ada");
    assert_eq!(c.full_name.as_deref(), Some("Ada Lovelace"));
    assert_eq!(c.skills, json!(["math"]));
    assert_eq!(c.education, Value::Null);
    assert_eq!(c.source, "directory");
  }

  #[test]
  fn scraped_shape_joins_names() {
    let raw = parse(json!({
      "linkedinUrl": "linkedin.com/in/grace",
      "firstName": "Grace",
      "lastName": "Hopper",
      "experiences": [{"company": "Navy"}]
    }));
    assert!(matches!(raw, RawCandidate::Scraped(_)));

    let c = raw.normalize("scraper").unwrap();
    assert_eq!(c.profile_url, "https://linkedin.com/in/grace");
    assert_eq!(c.full_name.as_deref(), Some("Grace Hopper"));
    assert_eq!(c.experience, json!([{"company": "Navy"}]));
  }

  #[test]
  fn fallback_uses_field_priority() {
    let raw = parse(json!({
      "url": "https://example.com/people/alan",
      "publicProfileUrl": "https://example.com/people/alan-turing/",
      "name": "",
      "firstName": "Alan",
      "lastName": "Turing",
      "title": "Cryptanalyst",
      "positions": [{"org": "Bletchley"}]
    }));
    assert!(matches!(raw, RawCandidate::Fields(_)));

    let c = raw.normalize("misc").unwrap();
    // `publicProfileUrl` outranks `url`.
    assert_eq!(c.profile_url, "https://example.com/people/alan-turing");
    // Empty `name` is skipped, split names are joined.
    assert_eq!(c.full_name.as_deref(), Some("Alan Turing"));
    assert_eq!(c.headline.as_deref(), Some("Cryptanalyst"));
    assert_eq!(c.experience, json!([{"org": "Bletchley"}]));
  }

  #[test]
  fn record_without_usable_url_is_dropped() {
    let raw = parse(json!({ "name": "Nobody", "url": "" }));
    assert!(raw.normalize("misc").is_none());

    let raw = parse(json!({ "profile_url": "ftp://nope" }));
    assert!(raw.normalize("directory").is_none());
  }
}
