//! Append-only table of bibliography entries.
//!
//! Every distinct edition text gets one generated key; letters citing the
//! same text share it. Keys are derived from the text (UUID v5) so the same
//! catalogue always yields the same keys, and always start with a letter so
//! they are valid `xs:ID` values.

use std::collections::HashMap;

use uuid::Uuid;

use crate::letter::BiblKey;

const NAMESPACE: Uuid = Uuid::from_u128(0x6a1e_3c7d_52b4_4f0e_9d21_8c3f_0b7a_e915);

/// One `<bibl>` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiblEntry {
  pub key:  BiblKey,
  pub text: String,
}

/// Normalised edition text → key, in first-seen order.
#[derive(Debug, Default)]
pub struct BibliographyTable {
  entries: Vec<BiblEntry>,
  index:   HashMap<String, usize>,
}

impl BibliographyTable {
  pub fn new() -> Self { Self::default() }

  /// Key for `text`, appending a new entry the first time it is seen.
  ///
  /// Text is trimmed and compared case-sensitively. Empty text has no key.
  pub fn key_for(&mut self, text: &str) -> Option<BiblKey> {
    let text = text.trim();
    if text.is_empty() {
      return None;
    }
    if let Some(&i) = self.index.get(text) {
      return Some(self.entries[i].key.clone());
    }

    let key = self.generate_key(text);
    self.index.insert(text.to_string(), self.entries.len());
    self.entries.push(BiblEntry {
      key:  key.clone(),
      text: text.to_string(),
    });
    Some(key)
  }

  /// Key already assigned to `text`, if any.
  pub fn get(&self, text: &str) -> Option<&BiblKey> {
    self.index.get(text.trim()).map(|&i| &self.entries[i].key)
  }

  pub fn entries(&self) -> &[BiblEntry] { &self.entries }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  fn generate_key(&self, text: &str) -> BiblKey {
    let mut salt = 0u32;
    loop {
      let name = if salt == 0 {
        text.to_string()
      } else {
        format!("{text}\u{0}{salt}")
      };
      let candidate = Uuid::new_v5(&NAMESPACE, name.as_bytes()).to_string();
      let usable = candidate.starts_with(|c: char| c.is_ascii_alphabetic())
        && !self.entries.iter().any(|e| e.key.as_str() == candidate);
      if usable {
        return BiblKey::new(candidate);
      }
      salt += 1;
    }
  }
}
