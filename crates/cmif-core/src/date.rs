//! Date interpretation for letter-catalogue cells.
//!
//! Accepts ISO 8601 calendar dates (`YYYY`, `YYYY-MM`, `YYYY-MM-DD`, signed
//! years allowed) and the EDTF extensions commonly found in catalogues:
//!
//! - `A/B`, `A/`, `/B`, `A/..`: closed and open intervals
//! - `[A..B]`, `[A,B,C]`, `[..B]`: one of a set
//! - `{A,B,C}`: all members of a set
//! - `YYYY-MM-XX`, `YYYY-XX-XX`, `YYYX`: unspecified digits
//! - `?`, `~`, `%`: uncertain / approximate qualifiers
//!
//! A single pair of surrounding brackets that is not set notation marks the
//! whole value as conjectured.

use std::fmt;

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const QUALIFIERS: [char; 3] = ['?', '~', '%'];

// ─── Calendar dates ──────────────────────────────────────────────────────────

/// How much of a calendar date is specified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
  Year,
  Month,
  Day,
}

/// A calendar date of year, month or day precision.
///
/// The visible value keeps its precision (`1850` stays `1850`); the covered
/// days are available through [`CalendarDate::first_day`] and
/// [`CalendarDate::last_day`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDate {
  year:  i32,
  month: Option<u32>,
  day:   Option<u32>,
  first: NaiveDate,
  last:  NaiveDate,
}

impl CalendarDate {
  /// Build a date, returning `None` for impossible calendar values.
  pub fn new(year: i32, month: Option<u32>, day: Option<u32>) -> Option<Self> {
    if day.is_some() && month.is_none() {
      return None;
    }
    let first =
      NaiveDate::from_ymd_opt(year, month.unwrap_or(1), day.unwrap_or(1))?;
    let last = match (month, day) {
      (Some(_), Some(_)) => first,
      (Some(_), None) => first
        .checked_add_months(Months::new(1))
        .and_then(|d| d.pred_opt())?,
      (None, _) => NaiveDate::from_ymd_opt(year, 12, 31)?,
    };
    Some(Self {
      year,
      month,
      day,
      first,
      last,
    })
  }

  /// Parse `[-]YYYY`, `[-]YYYY-MM` or `[-]YYYY-MM-DD`.
  pub fn parse(text: &str) -> Result<Self> {
    let invalid = || Error::InvalidDate(text.to_string());

    let (negative, body) = match text.strip_prefix('-') {
      Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => {
        (true, rest)
      }
      _ => (false, text),
    };

    let mut parts = body.split('-');
    let year = parts
      .next()
      .filter(|y| y.len() == 4)
      .and_then(digits)
      .ok_or_else(invalid)?;
    let year = if negative { -(year as i32) } else { year as i32 };
    let month = match parts.next() {
      Some(m) => Some(two_digits(m).ok_or_else(invalid)?),
      None => None,
    };
    let day = match parts.next() {
      Some(d) => Some(two_digits(d).ok_or_else(invalid)?),
      None => None,
    };
    if parts.next().is_some() {
      return Err(invalid());
    }

    Self::new(year, month, day).ok_or_else(invalid)
  }

  pub fn precision(&self) -> Precision {
    match (self.month, self.day) {
      (_, Some(_)) => Precision::Day,
      (Some(_), None) => Precision::Month,
      (None, None) => Precision::Year,
    }
  }

  pub fn year(&self) -> i32 { self.year }

  /// First calendar day covered by this date.
  pub fn first_day(&self) -> NaiveDate { self.first }

  /// Last calendar day covered by this date.
  pub fn last_day(&self) -> NaiveDate { self.last }
}

impl fmt::Display for CalendarDate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.year < 0 {
      write!(f, "-{:04}", self.year.unsigned_abs())?;
    } else {
      write!(f, "{:04}", self.year)?;
    }
    if let Some(month) = self.month {
      write!(f, "-{month:02}")?;
    }
    if let Some(day) = self.day {
      write!(f, "-{day:02}")?;
    }
    Ok(())
  }
}

fn digits(s: &str) -> Option<u32> {
  if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  s.parse().ok()
}

fn two_digits(s: &str) -> Option<u32> {
  if s.len() == 2 { digits(s) } else { None }
}

// ─── Temporal values ─────────────────────────────────────────────────────────

/// The interpretation of one date cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TemporalValue {
  /// A single date, as certain as its precision allows.
  Exact(CalendarDate),
  /// A single date that is conjectured.
  Uncertain(CalendarDate),
  /// A closed interval.
  Range {
    from:      CalendarDate,
    to:        CalendarDate,
    uncertain: bool,
  },
  /// An interval open on one side, or a "one of" set bounded on both.
  /// Only dates read back from XML carry the conjecture marker here.
  OpenRange {
    not_before: Option<CalendarDate>,
    not_after:  Option<CalendarDate>,
    uncertain:  bool,
  },
  /// Empty or unparseable cell; no date is written.
  #[default]
  Unknown,
}

impl TemporalValue {
  pub fn is_unknown(&self) -> bool { matches!(self, TemporalValue::Unknown) }

  /// Whether the value carries the conjecture marker.
  pub fn is_uncertain(&self) -> bool {
    matches!(
      self,
      TemporalValue::Uncertain(_)
        | TemporalValue::Range {
          uncertain: true,
          ..
        }
        | TemporalValue::OpenRange {
          uncertain: true,
          ..
        }
    )
  }

  /// TEI date attributes for this value.
  pub fn to_attributes(&self) -> DateAttributes {
    let mut attrs = DateAttributes::default();
    match self {
      TemporalValue::Exact(d) => attrs.when = Some(d.to_string()),
      TemporalValue::Uncertain(d) => {
        attrs.when = Some(d.to_string());
        attrs.uncertain = true;
      }
      TemporalValue::Range {
        from,
        to,
        uncertain,
      } => {
        attrs.from = Some(from.to_string());
        attrs.to = Some(to.to_string());
        attrs.uncertain = *uncertain;
      }
      TemporalValue::OpenRange {
        not_before,
        not_after,
        uncertain,
      } => {
        attrs.not_before = not_before.map(|d| d.to_string());
        attrs.not_after = not_after.map(|d| d.to_string());
        attrs.uncertain = *uncertain;
      }
      TemporalValue::Unknown => {}
    }
    attrs
  }

  /// Rebuild a value from TEI date attributes.
  ///
  /// `@when` wins over `@from`/`@to`, which win over
  /// `@notBefore`/`@notAfter`. A lone `@from` or `@to` becomes an open
  /// range. `@cert`/`@evidence` mark every variant, open ranges included.
  pub fn from_attributes(attrs: &DateAttributes) -> Result<Self> {
    let parse = |v: &Option<String>| -> Result<Option<CalendarDate>> {
      v.as_deref().map(CalendarDate::parse).transpose()
    };

    if let Some(when) = parse(&attrs.when)? {
      return Ok(if attrs.uncertain {
        TemporalValue::Uncertain(when)
      } else {
        TemporalValue::Exact(when)
      });
    }

    match (parse(&attrs.from)?, parse(&attrs.to)?) {
      (Some(from), Some(to)) => return range(from, to, attrs.uncertain),
      (None, None) => {}
      (from, to) => return open_range(from, to, attrs.uncertain),
    }

    match (parse(&attrs.not_before)?, parse(&attrs.not_after)?) {
      (None, None) => Ok(TemporalValue::Unknown),
      (not_before, not_after) => open_range(not_before, not_after, attrs.uncertain),
    }
  }

  /// Flat cell text used when extracting CSV from XML.
  ///
  /// Conjectured values get a trailing `?`; "one of" ranges bounded on both
  /// sides use EDTF set notation.
  pub fn to_flat(&self) -> String {
    match self {
      TemporalValue::Exact(d) => d.to_string(),
      TemporalValue::Uncertain(d) => format!("{d}?"),
      TemporalValue::Range {
        from,
        to,
        uncertain,
      } => {
        let suffix = if *uncertain { "?" } else { "" };
        format!("{from}/{to}{suffix}")
      }
      TemporalValue::OpenRange {
        not_before,
        not_after,
        uncertain,
      } => {
        let suffix = if *uncertain { "?" } else { "" };
        match (not_before, not_after) {
          (Some(a), Some(b)) => format!("[{a}..{b}]{suffix}"),
          (Some(a), None) => format!("{a}/{suffix}"),
          (None, Some(b)) => format!("/{b}{suffix}"),
          (None, None) => String::new(),
        }
      }
      TemporalValue::Unknown => String::new(),
    }
  }
}

/// TEI `<date>` attributes (`att.datable.w3c` plus certainty).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateAttributes {
  pub when:       Option<String>,
  pub from:       Option<String>,
  pub to:         Option<String>,
  pub not_before: Option<String>,
  pub not_after:  Option<String>,
  /// `@cert`/`@evidence` present.
  pub uncertain:  bool,
}

impl DateAttributes {
  pub fn is_empty(&self) -> bool {
    self.when.is_none()
      && self.from.is_none()
      && self.to.is_none()
      && self.not_before.is_none()
      && self.not_after.is_none()
  }

  /// Attribute name/value pairs in output order.
  pub fn pairs(&self) -> Vec<(&'static str, &str)> {
    let mut pairs = Vec::new();
    let named = [
      ("when", &self.when),
      ("from", &self.from),
      ("to", &self.to),
      ("notBefore", &self.not_before),
      ("notAfter", &self.not_after),
    ];
    for (name, value) in named {
      if let Some(v) = value {
        pairs.push((name, v.as_str()));
      }
    }
    if self.uncertain && !pairs.is_empty() {
      pairs.push(("cert", crate::letter::CERT_VALUE));
      pairs.push(("evidence", crate::letter::EVIDENCE_VALUE));
    }
    pairs
  }
}

// ─── Interpreter ─────────────────────────────────────────────────────────────

/// Interpret a date cell. Never fails: anything unparseable is
/// [`TemporalValue::Unknown`].
pub fn interpret(raw: &str) -> TemporalValue {
  parse(raw).unwrap_or(TemporalValue::Unknown)
}

/// Interpret a date cell, reporting why a non-empty cell was rejected.
pub fn parse(raw: &str) -> Result<TemporalValue> {
  parse_cell(raw).map_err(|e| match e {
    Error::InvalidDate(_) => Error::InvalidDate(raw.trim().to_string()),
    other => other,
  })
}

fn parse_cell(raw: &str) -> Result<TemporalValue> {
  let text = raw.trim();
  if text.is_empty() {
    return Ok(TemporalValue::Unknown);
  }

  let qualified = text.contains(QUALIFIERS);
  let normalized: String = text.chars().filter(|c| !QUALIFIERS.contains(c)).collect();
  let normalized = normalized.trim();
  if normalized.is_empty() {
    return Err(Error::InvalidDate(raw.to_string()));
  }

  // all members
  if let Some(inner) = enclosed(normalized, '{', '}') {
    return match set_bounds(inner)? {
      (Some(from), Some(to)) => range(from, to, qualified),
      _ => Err(Error::InvalidDate(raw.to_string())),
    };
  }

  let (body, bracketed) = match enclosed(normalized, '[', ']') {
    // one of a set
    Some(inner) if inner.contains(',') || inner.contains("..") => {
      let (not_before, not_after) = set_bounds(inner)?;
      return open_range(not_before, not_after, false);
    }
    Some(inner) => (inner.trim(), true),
    None => (normalized, false),
  };
  let uncertain = qualified || bracketed;

  match body.split_once('/') {
    Some((from, to)) => interval(from.trim(), to.trim(), uncertain),
    None => match Endpoint::parse(body)? {
      Endpoint::Day(d) if uncertain => Ok(TemporalValue::Uncertain(d)),
      Endpoint::Day(d) => Ok(TemporalValue::Exact(d)),
      Endpoint::Span(from, to) => range(from, to, uncertain),
    },
  }
}

fn enclosed(s: &str, open: char, close: char) -> Option<&str> {
  s.strip_prefix(open)?.strip_suffix(close)
}

/// One side of an interval, possibly with unspecified digits.
enum Endpoint {
  Day(CalendarDate),
  Span(CalendarDate, CalendarDate),
}

impl Endpoint {
  fn parse(text: &str) -> Result<Self> {
    let mut text = text;
    while text.len() > 4 {
      match text.strip_suffix("-XX") {
        Some(rest) => text = rest,
        None => break,
      }
    }
    if text.contains('X') {
      let a = CalendarDate::parse(&text.replace('X', "0"))?;
      let b = CalendarDate::parse(&text.replace('X', "9"))?;
      return Ok(if a.first_day() <= b.first_day() {
        Endpoint::Span(a, b)
      } else {
        Endpoint::Span(b, a)
      });
    }
    CalendarDate::parse(text).map(Endpoint::Day)
  }

  fn earliest(self) -> CalendarDate {
    match self {
      Endpoint::Day(d) | Endpoint::Span(d, _) => d,
    }
  }

  fn latest(self) -> CalendarDate {
    match self {
      Endpoint::Day(d) | Endpoint::Span(_, d) => d,
    }
  }
}

fn is_open(text: &str) -> bool { text.is_empty() || text == ".." }

fn interval(from: &str, to: &str, uncertain: bool) -> Result<TemporalValue> {
  let from = if is_open(from) {
    None
  } else {
    Some(Endpoint::parse(from)?.earliest())
  };
  let to = if is_open(to) {
    None
  } else {
    Some(Endpoint::parse(to)?.latest())
  };
  match (from, to) {
    (Some(from), Some(to)) => range(from, to, uncertain),
    (from, to) => open_range(from, to, false),
  }
}

/// First and last bound of an EDTF set body (`a,b..c`, `..b`, `a..`).
fn set_bounds(
  inner: &str,
) -> Result<(Option<CalendarDate>, Option<CalendarDate>)> {
  let first = inner
    .split(',')
    .next()
    .and_then(|m| m.split("..").next())
    .unwrap_or_default()
    .trim();
  let last = inner
    .rsplit(',')
    .next()
    .and_then(|m| m.rsplit("..").next())
    .unwrap_or_default()
    .trim();
  let first = if first.is_empty() {
    None
  } else {
    Some(Endpoint::parse(first)?.earliest())
  };
  let last = if last.is_empty() {
    None
  } else {
    Some(Endpoint::parse(last)?.latest())
  };
  Ok((first, last))
}

fn range(
  from: CalendarDate,
  to: CalendarDate,
  uncertain: bool,
) -> Result<TemporalValue> {
  if from.first_day() > to.last_day() {
    return Err(Error::InvertedInterval {
      from: from.to_string(),
      to:   to.to_string(),
    });
  }
  Ok(TemporalValue::Range {
    from,
    to,
    uncertain,
  })
}

fn open_range(
  not_before: Option<CalendarDate>,
  not_after: Option<CalendarDate>,
  uncertain: bool,
) -> Result<TemporalValue> {
  match (not_before, not_after) {
    (None, None) => Err(Error::InvalidDate(String::new())),
    (Some(a), Some(b)) if a.first_day() > b.last_day() => {
      Err(Error::InvertedInterval {
        from: a.to_string(),
        to:   b.to_string(),
      })
    }
    (not_before, not_after) => Ok(TemporalValue::OpenRange {
      not_before,
      not_after,
      uncertain,
    }),
  }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
