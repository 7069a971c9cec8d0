//! Authority-file references.
//!
//! Classification is purely textual: an ordered list of URI patterns, first
//! match wins, anything else is [`NameKind::Generic`]. No lookups are made.

use std::sync::LazyLock;

use regex::Regex;

use crate::letter::NameKind;

const GND_PREFIX: &str = "https://d-nb.info/gnd/";
const GEONAMES_PREFIX: &str = "https://www.geonames.org/";

static RULES: LazyLock<Vec<(Regex, NameKind)>> = LazyLock::new(|| {
  [
    // corporate bodies carry a hyphenated check digit
    (r"^https?://d-nb\.info/gnd/[0-9]{6,9}-[0-9X]$", NameKind::Org),
    (r"^https?://d-nb\.info/gnd/[0-9]+[0-9X]?$", NameKind::Person),
  ]
  .into_iter()
  .map(|(pattern, kind)| (Regex::new(pattern).expect("valid pattern"), kind))
  .collect()
});

/// Classify a correspondent reference. No reference means a person.
pub fn classify(reference: Option<&str>) -> NameKind {
  let Some(uri) = reference else {
    return NameKind::Person;
  };
  RULES
    .iter()
    .find(|(pattern, _)| pattern.is_match(uri))
    .map(|(_, kind)| *kind)
    .unwrap_or(NameKind::Generic)
}

/// Complete a bare GND number to its URI; other values are returned trimmed.
///
/// A value counts as a GND number when everything but its last two
/// characters is digits (covering `-X` check suffixes).
pub fn person_uri(id: &str) -> String {
  let id = id.trim();
  if !id.starts_with("http") && is_gnd_number(id) {
    return format!("{GND_PREFIX}{id}");
  }
  id.to_string()
}

fn is_gnd_number(id: &str) -> bool {
  id.len() > 2
    && id.is_char_boundary(id.len() - 2)
    && id[..id.len() - 2].bytes().all(|b| b.is_ascii_digit())
}

/// Normalise a place reference to a GeoNames URI.
///
/// Bare numeric IDs are completed; anything that is not a GeoNames URI is
/// rejected with `None`.
pub fn place_uri(id: &str) -> Option<String> {
  let id = id.trim();
  if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
    return Some(format!("{GEONAMES_PREFIX}{id}"));
  }
  id.contains("geonames.org").then(|| id.to_string())
}
