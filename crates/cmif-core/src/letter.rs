//! Letter records, the unit exchanged between the CSV and XML sides.
//!
//! A [`Letter`] is built fresh for every input row (or every
//! `correspDesc` element), encoded, and dropped. Nothing in here is shared
//! between records except the [`BiblKey`]s handed out by the bibliography
//! table.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{authority, date::TemporalValue};

/// `@cert` value written for conjectured names, places and dates.
pub const CERT_VALUE: &str = "medium";
/// `@evidence` value written for conjectured names, places and dates.
pub const EVIDENCE_VALUE: &str = "conjecture";

// ─── Correspondents ──────────────────────────────────────────────────────────

/// What kind of entity a correspondent reference points at.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum NameKind {
  #[default]
  Person,
  Org,
  /// A reference whose authority pattern is not recognised.
  Generic,
}

impl NameKind {
  /// TEI element name used for a correspondent of this kind.
  pub fn tag(self) -> &'static str {
    match self {
      NameKind::Person  => "persName",
      NameKind::Org     => "orgName",
      NameKind::Generic => "name",
    }
  }

  pub fn from_tag(tag: &str) -> Option<Self> {
    match tag {
      "persName" => Some(NameKind::Person),
      "orgName"  => Some(NameKind::Org),
      "name"     => Some(NameKind::Generic),
      _ => None,
    }
  }
}

/// One sender or addressee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRef {
  pub name:      String,
  /// The name was bracket-enclosed in the source cell.
  pub uncertain: bool,
  /// Authority-file URI (GND, VIAF, LOC, …).
  pub reference: Option<String>,
  pub kind:      NameKind,
}

impl PersonRef {
  /// Build a reference, classifying its kind from the authority URI.
  pub fn new(
    name: impl Into<String>,
    uncertain: bool,
    reference: Option<String>,
  ) -> Self {
    let kind = authority::classify(reference.as_deref());
    Self {
      name: name.into(),
      uncertain,
      reference,
      kind,
    }
  }
}

/// The place a letter was written at or sent to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceRef {
  pub name:      String,
  pub uncertain: bool,
  /// GeoNames URI.
  pub reference: Option<String>,
}

// ─── Actions ─────────────────────────────────────────────────────────────────

/// Which side of the correspondence an action describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
  Sent,
  Received,
}

impl ActionType {
  pub fn as_str(self) -> &'static str {
    match self {
      ActionType::Sent     => "sent",
      ActionType::Received => "received",
    }
  }

  pub fn from_attr(value: &str) -> Option<Self> {
    match value {
      "sent"     => Some(ActionType::Sent),
      "received" => Some(ActionType::Received),
      _ => None,
    }
  }
}

impl fmt::Display for ActionType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A `correspAction`: who, where and when.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrespAction {
  pub persons: Vec<PersonRef>,
  pub place:   Option<PlaceRef>,
  pub date:    TemporalValue,
}

// ─── Letter ──────────────────────────────────────────────────────────────────

/// Generated identifier of a bibliography entry (`<bibl xml:id>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BiblKey(String);

impl BiblKey {
  pub fn new(key: impl Into<String>) -> Self { Self(key.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for BiblKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// One catalogued letter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Letter {
  pub sent:        Option<CorrespAction>,
  pub received:    Option<CorrespAction>,
  /// Bibliography entry the letter is edited in. `None` means the
  /// catalogue's default source description applies.
  pub edition:     Option<BiblKey>,
  /// External number or link; links (`http…`) are written as `@ref`.
  pub key:         Option<String>,
  pub note:        Option<String>,
  /// Physical line of the source row, when line numbering is requested.
  pub line_number: Option<u64>,
}

impl Letter {
  /// A letter without any correspondence action carries no information.
  pub fn is_empty(&self) -> bool {
    self.sent.is_none() && self.received.is_none()
  }

  pub fn action(&self, action_type: ActionType) -> Option<&CorrespAction> {
    match action_type {
      ActionType::Sent     => self.sent.as_ref(),
      ActionType::Received => self.received.as_ref(),
    }
  }

  pub fn action_mut(
    &mut self,
    action_type: ActionType,
  ) -> &mut Option<CorrespAction> {
    match action_type {
      ActionType::Sent     => &mut self.sent,
      ActionType::Received => &mut self.received,
    }
  }

  /// Whether [`Letter::key`] is a link rather than a plain number.
  pub fn key_is_link(&self) -> bool {
    self.key.as_deref().is_some_and(|k| k.starts_with("http"))
  }
}
