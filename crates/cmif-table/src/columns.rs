//! Mapping between recognised field names and CSV columns.
//!
//! The header is validated once, when the table is opened; rows are then
//! read through the resulting [`ColumnMap`] by [`Field`], never by string.

use std::fmt;

use cmif_core::letter::ActionType;
use csv::StringRecord;
use tracing::debug;

use crate::error::{Error, Result};

// ─── Fields ──────────────────────────────────────────────────────────────────

/// A column the converter understands. Names are case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
  Sender,
  SenderId,
  SenderPlace,
  SenderPlaceId,
  SenderDate,
  Addressee,
  AddresseeId,
  AddresseePlace,
  AddresseePlaceId,
  AddresseeDate,
  Edition,
  Key,
  Note,
}

impl Field {
  pub const ALL: [Field; 13] = [
    Field::Sender,
    Field::SenderId,
    Field::SenderPlace,
    Field::SenderPlaceId,
    Field::SenderDate,
    Field::Addressee,
    Field::AddresseeId,
    Field::AddresseePlace,
    Field::AddresseePlaceId,
    Field::AddresseeDate,
    Field::Edition,
    Field::Key,
    Field::Note,
  ];

  pub fn column_name(self) -> &'static str {
    match self {
      Field::Sender           => "sender",
      Field::SenderId         => "senderID",
      Field::SenderPlace      => "senderPlace",
      Field::SenderPlaceId    => "senderPlaceID",
      Field::SenderDate       => "senderDate",
      Field::Addressee        => "addressee",
      Field::AddresseeId      => "addresseeID",
      Field::AddresseePlace   => "addresseePlace",
      Field::AddresseePlaceId => "addresseePlaceID",
      Field::AddresseeDate    => "addresseeDate",
      Field::Edition          => "edition",
      Field::Key              => "key",
      Field::Note             => "note",
    }
  }

  pub fn from_column(name: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|f| f.column_name() == name)
  }

  fn index(self) -> usize { self as usize }
}

impl fmt::Display for Field {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.column_name())
  }
}

/// The five columns describing one side of a letter.
#[derive(Debug, Clone, Copy)]
pub struct ActionFields {
  pub name:     Field,
  pub id:       Field,
  pub place:    Field,
  pub place_id: Field,
  pub date:     Field,
}

impl ActionFields {
  pub fn of(action: ActionType) -> Self {
    match action {
      ActionType::Sent => Self {
        name:     Field::Sender,
        id:       Field::SenderId,
        place:    Field::SenderPlace,
        place_id: Field::SenderPlaceId,
        date:     Field::SenderDate,
      },
      ActionType::Received => Self {
        name:     Field::Addressee,
        id:       Field::AddresseeId,
        place:    Field::AddresseePlace,
        place_id: Field::AddresseePlaceId,
        date:     Field::AddresseeDate,
      },
    }
  }
}

// ─── Column map ──────────────────────────────────────────────────────────────

/// Position of every recognised field in the input header.
#[derive(Debug, Clone)]
pub struct ColumnMap {
  positions: [Option<usize>; 13],
}

impl ColumnMap {
  /// Validate a header. `sender` and `addressee` are required; unknown
  /// columns are ignored. If a name repeats, the first column wins.
  pub fn from_headers<'a, I>(headers: I) -> Result<Self>
  where
    I: IntoIterator<Item = &'a str>,
  {
    let mut positions = [None; 13];
    for (i, name) in headers.into_iter().enumerate() {
      match Field::from_column(name) {
        Some(field) if positions[field.index()].is_none() => {
          positions[field.index()] = Some(i);
        }
        Some(field) => debug!(column = i, %field, "duplicate column ignored"),
        None => debug!(column = i, name, "unrecognised column ignored"),
      }
    }

    for required in [Field::Sender, Field::Addressee] {
      if positions[required.index()].is_none() {
        return Err(Error::MissingColumn(required.column_name()));
      }
    }

    Ok(Self { positions })
  }

  /// Whether the input has a column for `field`.
  pub fn has(&self, field: Field) -> bool {
    self.positions[field.index()].is_some()
  }

  /// Copy the recognised cells out of `record`.
  pub fn cells(&self, record: &StringRecord) -> Cells {
    let mut cells = Cells::default();
    for field in Field::ALL {
      if let Some(value) = self.positions[field.index()].and_then(|i| record.get(i)) {
        cells.set(field, value);
      }
    }
    cells
  }
}

// ─── Cells ───────────────────────────────────────────────────────────────────

/// The recognised, trimmed, non-empty cells of one row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cells {
  values: [Option<String>; 13],
}

impl Cells {
  pub fn from_pairs<'a, I>(pairs: I) -> Self
  where
    I: IntoIterator<Item = (Field, &'a str)>,
  {
    let mut cells = Self::default();
    for (field, value) in pairs {
      cells.set(field, value);
    }
    cells
  }

  /// Store a cell; blank values count as absent.
  pub fn set(&mut self, field: Field, value: &str) {
    let value = value.trim();
    self.values[field.index()] = (!value.is_empty()).then(|| value.to_string());
  }

  pub fn get(&self, field: Field) -> Option<&str> {
    self.values[field.index()].as_deref()
  }
}
