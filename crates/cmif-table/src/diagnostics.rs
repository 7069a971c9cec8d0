//! Row-level problems found while building letters.
//!
//! None of these abort a run. Each is logged when recorded and kept for the
//! end-of-run summary.

use std::fmt;

use tracing::warn;

use crate::columns::Field;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
  /// A date cell could not be interpreted; the date is omitted.
  UnparseableDate { raw: String, reason: String },
  /// The ID cell had a different number of entries than the name cell.
  IdCountMismatch { names: usize, ids: usize },
  /// A place reference that is not a GeoNames URI; the reference is dropped.
  NonGeonamesPlace { raw: String },
  /// A key or link on a letter with no edition; the key is dropped.
  KeyWithoutEdition,
  /// Neither sender nor addressee; the row is dropped.
  NoCorrespondents,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
  /// Physical line of the row in the input.
  pub line:  u64,
  pub field: Option<Field>,
  pub kind:  DiagnosticKind,
}

impl fmt::Display for Diagnostic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "line {}", self.line)?;
    if let Some(field) = self.field {
      write!(f, ", {field}")?;
    }
    match &self.kind {
      DiagnosticKind::UnparseableDate { raw, reason } => {
        write!(f, ": could not parse {raw:?} ({reason})")
      }
      DiagnosticKind::IdCountMismatch { names, ids } => {
        write!(f, ": {names} name(s) but {ids} ID(s)")
      }
      DiagnosticKind::NonGeonamesPlace { raw } => {
        write!(f, ": {raw:?} is a non-standard GeoNames ID")
      }
      DiagnosticKind::KeyWithoutEdition => f.write_str(": key without edition"),
      DiagnosticKind::NoCorrespondents => {
        f.write_str(": no sender or addressee, row skipped")
      }
    }
  }
}

/// All diagnostics of one run, in input order.
#[derive(Debug, Default)]
pub struct Diagnostics {
  items: Vec<Diagnostic>,
}

impl Diagnostics {
  pub fn new() -> Self { Self::default() }

  /// Record and log a diagnostic.
  pub fn push(&mut self, line: u64, field: Option<Field>, kind: DiagnosticKind) {
    let diagnostic = Diagnostic { line, field, kind };
    warn!("{diagnostic}");
    self.items.push(diagnostic);
  }

  pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> { self.items.iter() }

  pub fn len(&self) -> usize { self.items.len() }

  pub fn is_empty(&self) -> bool { self.items.is_empty() }

  /// Diagnostics raised for one input line.
  pub fn for_line(&self, line: u64) -> impl Iterator<Item = &Diagnostic> {
    self.items.iter().filter(move |d| d.line == line)
  }

  /// Number of distinct lines with at least one diagnostic.
  pub fn affected_lines(&self) -> usize {
    let mut lines: Vec<u64> = self.items.iter().map(|d| d.line).collect();
    lines.dedup();
    lines.len()
  }
}
