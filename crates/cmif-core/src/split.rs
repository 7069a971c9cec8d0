//! Splitting of multi-valued cells.
//!
//! A single cell may hold several correspondents (`Schmidt;Müller`) whose
//! authority IDs sit at the same positions of a companion cell. Pieces are
//! trimmed, and bracket detection happens per piece after splitting.

/// Split a name cell into `(name, uncertain)` pairs.
///
/// A piece wrapped in `[...]` is unwrapped and flagged uncertain. Empty
/// pieces are kept so positions stay aligned with the ID cell.
pub fn split(cell: &str, delimiter: &str) -> Vec<(String, bool)> {
  pieces(cell, delimiter)
    .map(|piece| match unbracket(piece) {
      Some(inner) => (inner.trim().to_string(), true),
      None => (piece.to_string(), false),
    })
    .collect()
}

/// Split an ID cell; empty pieces become `None`.
pub fn split_ids(cell: &str, delimiter: &str) -> Vec<Option<String>> {
  pieces(cell, delimiter)
    .map(|piece| (!piece.is_empty()).then(|| piece.to_string()))
    .collect()
}

/// Strip one pair of surrounding brackets.
pub fn unbracket(piece: &str) -> Option<&str> {
  piece.strip_prefix('[')?.strip_suffix(']')
}

fn pieces<'a>(
  cell: &'a str,
  delimiter: &'a str,
) -> Box<dyn Iterator<Item = &'a str> + 'a> {
  if delimiter.is_empty() {
    Box::new(std::iter::once(cell.trim()))
  } else {
    Box::new(cell.split(delimiter).map(str::trim))
  }
}

/// Result of pairing names with positional IDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paired {
  /// `(name, uncertain, id)` in source order; empty names are dropped.
  pub entries:  Vec<(String, bool, Option<String>)>,
  /// The ID cell had a different number of pieces than the name cell.
  pub mismatch: bool,
}

/// Pair name `i` with ID `i`. No reordering or fuzzy matching.
pub fn pair(names: Vec<(String, bool)>, ids: Vec<Option<String>>) -> Paired {
  let mismatch = ids.iter().any(Option::is_some) && ids.len() != names.len();
  let mut ids = ids.into_iter();
  let entries = names
    .into_iter()
    .map(|(name, uncertain)| (name, uncertain, ids.next().flatten()))
    .filter(|(name, ..)| !name.is_empty())
    .collect();
  Paired { entries, mismatch }
}
