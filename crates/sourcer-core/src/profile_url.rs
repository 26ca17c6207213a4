//! Canonical profile URLs, the identity key of a candidate.
//!
//! The canonical form is `scheme://host/path` with no query string, fragment,
//! port, or trailing slash. Two provider records that canonicalise to the same
//! string describe the same person.

use url::Url;

use crate::{Error, Result};

/// Normalise `raw` to its canonical form.
///
/// A missing scheme is treated as `https`. Only `http` and `https` URLs with a
/// host are accepted.
pub fn canonicalize(raw: &str) -> Result<String> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return Err(Error::InvalidProfileUrl(raw.to_owned()));
  }

  let parsed = if trimmed.contains("://") {
    Url::parse(trimmed)
  } else {
    Url::parse(&format!("https://{trimmed}"))
  }
  .map_err(|_| Error::InvalidProfileUrl(raw.to_owned()))?;

  if !matches!(parsed.scheme(), "http" | "https") {
    return Err(Error::InvalidProfileUrl(raw.to_owned()));
  }
  let host = parsed
    .host_str()
    .filter(|h| !h.is_empty())
    .ok_or_else(|| Error::InvalidProfileUrl(raw.to_owned()))?;

  let path = parsed.path().trim_end_matches('/');
  Ok(format!("{}://{}{}", parsed.scheme(), host, path))
}

/// Like [`canonicalize`], but discards unusable input.
pub fn try_canonicalize(raw: &str) -> Option<String> { canonicalize(raw).ok() }
