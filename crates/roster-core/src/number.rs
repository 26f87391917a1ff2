//! Membership number formatting and sequencing.
//!
//! A member number has the shape `<ORG-PREFIX>/<ABBR>/<NNN>`, where `ABBR`
//! is the abbreviation of the member's category and `NNN` is a per-sequence
//! counter zero-padded to at least three digits. Each abbreviation is its own
//! sequence; every unrecognised category shares the fallback sequence.
//!
//! The functions here are pure. Reading and advancing the persisted counter
//! is the store's job, inside the same transaction that writes the number.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Course codes recognised out of the box.
pub const DEFAULT_COURSES: &[&str] = &[
  "URP", "URD", "CE", "CM", "QS", "CT", "RE", "EEE", "ME", "AAE", "GE", "GIC",
  "GIN", "SV", "LA", "CHE", "ARC",
];

pub const DEFAULT_ORG_PREFIX: &str = "AECAS";
pub const DEFAULT_FALLBACK: &str = "GEN";

/// Minimum width of the numeric suffix; larger values are never truncated.
const MIN_WIDTH: usize = 3;

/// Marker on the suffix of a degraded number. Keeps such numbers out of
/// suffix parsing so they never advance a sequence.
const DEGRADED_MARKER: char = 'T';

// ─── Format ──────────────────────────────────────────────────────────────────

/// How category names map onto number prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberFormat {
  org_prefix:    String,
  /// Upper-cased category → abbreviation.
  abbreviations: BTreeMap<String, String>,
  fallback:      String,
}

impl Default for NumberFormat {
  fn default() -> Self { Self::new(DEFAULT_ORG_PREFIX) }
}

impl NumberFormat {
  /// A format using `org_prefix` and the default course table.
  pub fn new(org_prefix: impl Into<String>) -> Self {
    Self {
      org_prefix:    org_prefix.into(),
      abbreviations: DEFAULT_COURSES
        .iter()
        .map(|c| ((*c).to_owned(), (*c).to_owned()))
        .collect(),
      fallback:      DEFAULT_FALLBACK.to_owned(),
    }
  }

  /// Map an additional category (e.g. an area of interest) to `abbreviation`.
  pub fn with_abbreviation(
    mut self,
    category: &str,
    abbreviation: impl Into<String>,
  ) -> Self {
    self
      .abbreviations
      .insert(category.trim().to_uppercase(), abbreviation.into());
    self
  }

  pub fn org_prefix(&self) -> &str { &self.org_prefix }

  /// The sequence a category numbers into. Lookup is case-insensitive;
  /// unknown categories get the fallback abbreviation.
  pub fn abbreviation(&self, category: &str) -> &str {
    self
      .abbreviations
      .get(&category.trim().to_uppercase())
      .unwrap_or(&self.fallback)
  }

  /// Everything before the numeric suffix, e.g. `AECAS/CE/`.
  pub fn sequence_prefix(&self, abbreviation: &str) -> String {
    format!("{}/{}/", self.org_prefix, abbreviation)
  }

  /// Render value `n` in the `abbreviation` sequence.
  pub fn format(&self, abbreviation: &str, n: u64) -> String {
    format!(
      "{}{:0width$}",
      self.sequence_prefix(abbreviation),
      n,
      width = MIN_WIDTH
    )
  }

  /// The number handed out when the sequence cannot be read: the six
  /// low-order digits of the current unix milliseconds behind a `T` marker.
  pub fn degraded(&self, abbreviation: &str, now: DateTime<Utc>) -> String {
    let low = now.timestamp_millis().rem_euclid(1_000_000);
    format!(
      "{}{DEGRADED_MARKER}{low:06}",
      self.sequence_prefix(abbreviation)
    )
  }
}

// ─── Sequencing ──────────────────────────────────────────────────────────────

/// Parse the numeric suffix (last `/`-delimited segment) of a member number.
/// Returns `None` for legacy or degraded numbers without a numeric suffix.
pub fn parse_suffix(number: &str) -> Option<u64> {
  let (_, suffix) = number.rsplit_once('/')?;
  if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  suffix.parse().ok()
}

/// The value following the highest parsable suffix in `existing`, or `1`
/// when there is none.
pub fn next_in_sequence<'a>(existing: impl IntoIterator<Item = &'a str>) -> u64 {
  existing
    .into_iter()
    .filter_map(parse_suffix)
    .max()
    .unwrap_or(0)
    + 1
}

// ─── Results ─────────────────────────────────────────────────────────────────

/// The result of asking the allocator for a number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "number", rename_all = "snake_case")]
pub enum Allocation {
  /// Taken from the persisted sequence; unique.
  Assigned(String),
  /// Derived from the clock because the sequence could not be read.
  Degraded(String),
}

impl Allocation {
  pub fn number(&self) -> &str {
    match self {
      Self::Assigned(n) | Self::Degraded(n) => n,
    }
  }

  pub fn is_degraded(&self) -> bool { matches!(self, Self::Degraded(_)) }
}

/// A persisted counter for one abbreviation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberSequence {
  pub abbreviation: String,
  /// The highest value handed out so far.
  pub last_value:   u64,
  pub updated_at:   DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn pads_to_three_digits_without_truncating() {
    let f = NumberFormat::default();
    assert_eq!(f.format("CE", 1), "AECAS/CE/001");
    assert_eq!(f.format("CE", 7), "AECAS/CE/007");
    assert_eq!(f.format("CE", 999), "AECAS/CE/999");
    assert_eq!(f.format("CE", 1000), "AECAS/CE/1000");
    assert_eq!(f.format("CE", 1200), "AECAS/CE/1200");
  }

  #[test]
  fn unknown_category_uses_fallback() {
    let f = NumberFormat::default();
    assert_eq!(f.abbreviation("ce"), "CE");
    assert_eq!(f.abbreviation(" CHE "), "CHE");
    assert_eq!(f.abbreviation("Basket weaving"), "GEN");
  }

  #[test]
  fn extra_abbreviations_are_case_insensitive() {
    let f = NumberFormat::new("SOC").with_abbreviation("Project Management", "PM");
    assert_eq!(f.abbreviation("project management"), "PM");
    assert_eq!(f.format(f.abbreviation("PROJECT MANAGEMENT"), 2), "SOC/PM/002");
  }

  #[test]
  fn suffix_parsing_ignores_non_numeric() {
    assert_eq!(parse_suffix("AECAS/CE/012"), Some(12));
    assert_eq!(parse_suffix("AECAS/CE/1000"), Some(1000));
    assert_eq!(parse_suffix("AECAS/CE/T123456"), None);
    assert_eq!(parse_suffix("AECAS/CE/"), None);
    assert_eq!(parse_suffix("AECAS-001"), None);
  }

  #[test]
  fn next_follows_the_maximum() {
    assert_eq!(next_in_sequence(Vec::<&str>::new()), 1);
    assert_eq!(
      next_in_sequence(["AECAS/CE/003", "AECAS/CE/010", "AECAS/CE/T000999", "junk"]),
      11
    );
  }

  #[test]
  fn degraded_number_is_marked_and_unparsable() {
    let f = NumberFormat::default();
    let now = Utc.timestamp_millis_opt(1_700_000_123_456).unwrap();
    let n = f.degraded("CE", now);
    assert_eq!(n, "AECAS/CE/T123456");
    assert_eq!(parse_suffix(&n), None);
  }
}
