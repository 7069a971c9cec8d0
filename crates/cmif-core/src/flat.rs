//! Flat CSV rows extracted from letters.

use serde::{Deserialize, Serialize};

use crate::letter::{CorrespAction, Letter};

/// One output row of the XML → CSV direction.
///
/// Field order matches [`FlatRow::HEADER`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRow {
  pub sender:             String,
  #[serde(rename = "senderID")]
  pub sender_id:          String,
  #[serde(rename = "senderPlace")]
  pub sender_place:       String,
  #[serde(rename = "senderPlaceID")]
  pub sender_place_id:    String,
  #[serde(rename = "senderDate")]
  pub sender_date:        String,
  pub addressee:          String,
  #[serde(rename = "addresseeID")]
  pub addressee_id:       String,
  #[serde(rename = "addresseePlace")]
  pub addressee_place:    String,
  #[serde(rename = "addresseePlaceID")]
  pub addressee_place_id: String,
  #[serde(rename = "addresseeDate")]
  pub addressee_date:     String,
  pub edition:            String,
  pub key:                String,
  pub note:               String,
}

/// The five cells describing one side of a letter.
#[derive(Debug, Default)]
struct ActionCells {
  names:    String,
  ids:      String,
  place:    String,
  place_id: String,
  date:     String,
}

impl ActionCells {
  fn from_action(action: Option<&CorrespAction>, delimiter: &str) -> Self {
    let Some(action) = action else {
      return Self::default();
    };

    let names = action
      .persons
      .iter()
      .map(|p| conjectured(&p.name, p.uncertain))
      .collect::<Vec<_>>()
      .join(delimiter);
    let ids = if action.persons.iter().any(|p| p.reference.is_some()) {
      action
        .persons
        .iter()
        .map(|p| p.reference.as_deref().unwrap_or_default())
        .collect::<Vec<_>>()
        .join(delimiter)
    } else {
      String::new()
    };
    let (place, place_id) = match &action.place {
      Some(place) => (
        conjectured(&place.name, place.uncertain),
        place.reference.clone().unwrap_or_default(),
      ),
      None => (String::new(), String::new()),
    };

    Self {
      names,
      ids,
      place,
      place_id,
      date: action.date.to_flat(),
    }
  }
}

/// Conjectured values are written with a trailing `?`.
fn conjectured(text: &str, uncertain: bool) -> String {
  if uncertain {
    format!("{text}?")
  } else {
    text.to_string()
  }
}

impl FlatRow {
  pub const HEADER: [&'static str; 13] = [
    "sender",
    "senderID",
    "senderPlace",
    "senderPlaceID",
    "senderDate",
    "addressee",
    "addresseeID",
    "addresseePlace",
    "addresseePlaceID",
    "addresseeDate",
    "edition",
    "key",
    "note",
  ];

  /// Flatten `letter`, with `edition` the already-resolved bibliography
  /// text. Multiple correspondents are joined with `delimiter`.
  pub fn from_letter(letter: &Letter, edition: &str, delimiter: &str) -> Self {
    let sent = ActionCells::from_action(letter.sent.as_ref(), delimiter);
    let received = ActionCells::from_action(letter.received.as_ref(), delimiter);
    Self {
      sender:             sent.names,
      sender_id:          sent.ids,
      sender_place:       sent.place,
      sender_place_id:    sent.place_id,
      sender_date:        sent.date,
      addressee:          received.names,
      addressee_id:       received.ids,
      addressee_place:    received.place,
      addressee_place_id: received.place_id,
      addressee_date:     received.date,
      edition:            edition.to_string(),
      key:                letter.key.clone().unwrap_or_default(),
      note:               letter.note.clone().unwrap_or_default(),
    }
  }
}
