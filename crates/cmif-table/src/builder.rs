//! Building [`Letter`]s from table rows.
//!
//! One builder lives for one conversion run. It owns the bibliography table,
//! so edition keys stay stable across rows, and it collects the row-level
//! diagnostics. Nothing a row does can abort the run.

use cmif_core::{
  DEFAULT_DELIMITER, authority,
  bibliography::BibliographyTable,
  date::{self, TemporalValue},
  letter::{ActionType, CorrespAction, Letter, PersonRef, PlaceRef},
  split::{pair, split, split_ids, unbracket},
};
use csv::StringRecord;
use tracing::{debug, info};

use crate::{
  columns::{ActionFields, Cells, ColumnMap, Field},
  diagnostics::{DiagnosticKind, Diagnostics},
};

// ─── Options and outcomes ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct BuildOptions {
  /// Separator of several values within one cell.
  pub delimiter:        String,
  /// Keep rows without an edition, falling back to the catalogue default.
  pub include_unedited: bool,
  /// Record each row's physical line on its letter.
  pub line_numbers:     bool,
  /// Carry the `note` cell onto the letter.
  pub notes:            bool,
  /// The catalogue has a default source description.
  pub default_edition:  bool,
}

impl Default for BuildOptions {
  fn default() -> Self {
    Self {
      delimiter:        DEFAULT_DELIMITER.to_string(),
      include_unedited: false,
      line_numbers:     false,
      notes:            true,
      default_edition:  false,
    }
  }
}

/// Why a row produced no letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
  /// The row has no edition and unedited letters are excluded.
  Unedited,
  /// The row has neither sender nor addressee.
  NoCorrespondents,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
  Letter(Letter),
  Dropped(DropReason),
}

/// Per-run counters for the summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
  pub rows:     usize,
  pub letters:  usize,
  pub unedited: usize,
  pub empty:    usize,
}

// ─── Builder ─────────────────────────────────────────────────────────────────

pub struct RecordBuilder {
  columns:      ColumnMap,
  options:      BuildOptions,
  bibliography: BibliographyTable,
  diagnostics:  Diagnostics,
  stats:        BuildStats,
}

impl RecordBuilder {
  pub fn new(columns: ColumnMap, options: BuildOptions) -> Self {
    Self {
      columns,
      options,
      bibliography: BibliographyTable::new(),
      diagnostics: Diagnostics::new(),
      stats: BuildStats::default(),
    }
  }

  pub fn columns(&self) -> &ColumnMap { &self.columns }

  pub fn options(&self) -> &BuildOptions { &self.options }

  /// Whether the catalogue has a default source description. Only known
  /// once the header has been read.
  pub fn set_default_edition(&mut self, present: bool) {
    self.options.default_edition = present;
  }

  pub fn bibliography(&self) -> &BibliographyTable { &self.bibliography }

  pub fn diagnostics(&self) -> &Diagnostics { &self.diagnostics }

  pub fn stats(&self) -> BuildStats { self.stats }

  /// Build from a raw CSV record at physical line `line`.
  pub fn build_record(&mut self, record: &StringRecord, line: u64) -> RowOutcome {
    let cells = self.columns.cells(record);
    self.build(&cells, line)
  }

  /// Build one letter, or report why the row is dropped.
  pub fn build(&mut self, cells: &Cells, line: u64) -> RowOutcome {
    self.stats.rows += 1;

    // checked before the edition so an empty row is always reported
    if !self.has_names(cells, Field::Sender) && !self.has_names(cells, Field::Addressee) {
      self.diagnostics.push(line, None, DiagnosticKind::NoCorrespondents);
      self.stats.empty += 1;
      return RowOutcome::Dropped(DropReason::NoCorrespondents);
    }

    let edited = cells.get(Field::Edition).is_some();
    if self.columns.has(Field::Edition) && !edited && !self.options.include_unedited {
      info!(line, "letter without edition skipped");
      self.stats.unedited += 1;
      return RowOutcome::Dropped(DropReason::Unedited);
    }

    let sent = self.action(cells, ActionType::Sent, line);
    let received = self.action(cells, ActionType::Received, line);

    let edition = cells
      .get(Field::Edition)
      .and_then(|text| self.bibliography.key_for(text));

    let mut key = cells.get(Field::Key).map(str::to_string);
    if key.is_some() && edition.is_none() && !self.options.default_edition {
      self.diagnostics.push(line, Some(Field::Key), DiagnosticKind::KeyWithoutEdition);
      key = None;
    }

    self.stats.letters += 1;
    RowOutcome::Letter(Letter {
      sent,
      received,
      edition,
      key,
      note: cells
        .get(Field::Note)
        .filter(|_| self.options.notes)
        .map(str::to_string),
      line_number: self.options.line_numbers.then_some(line),
    })
  }

  fn has_names(&self, cells: &Cells, field: Field) -> bool {
    cells.get(field).is_some_and(|cell| {
      split(cell, &self.options.delimiter)
        .iter()
        .any(|(name, _)| !name.is_empty())
    })
  }

  /// Build one side of the letter; `None` when its name cell holds no names.
  fn action(
    &mut self,
    cells: &Cells,
    side: ActionType,
    line: u64,
  ) -> Option<CorrespAction> {
    let fields = ActionFields::of(side);
    let delimiter = self.options.delimiter.as_str();

    let Some(name_cell) = cells.get(fields.name) else {
      info!(line, "no information on {}", fields.name);
      return None;
    };
    let names = split(name_cell, delimiter);
    let ids = cells
      .get(fields.id)
      .map(|cell| split_ids(cell, delimiter))
      .unwrap_or_default();
    let (name_count, id_count) = (names.len(), ids.len());

    let paired = pair(names, ids);
    if paired.mismatch {
      self.diagnostics.push(line, Some(fields.id), DiagnosticKind::IdCountMismatch {
        names: name_count,
        ids:   id_count,
      });
    }
    if paired.entries.is_empty() {
      info!(line, "no information on {}", fields.name);
      return None;
    }

    let persons = paired
      .entries
      .into_iter()
      .map(|(name, uncertain, id)| {
        let reference = id.map(|id| {
          let uri = authority::person_uri(&id);
          if uri != id {
            debug!(line, id, "assigning ID to GND");
          }
          uri
        });
        if reference.is_none() {
          debug!(line, correspondent = %name, "ID missing");
        }
        if uncertain {
          info!(line, correspondent = %name, "added @evidence to {}", fields.name);
        }
        PersonRef::new(name, uncertain, reference)
      })
      .collect();

    Some(CorrespAction {
      persons,
      place: self.place(cells, fields, line),
      date: self.date(cells, fields.date, line),
    })
  }

  fn place(&mut self, cells: &Cells, fields: ActionFields, line: u64) -> Option<PlaceRef> {
    let cell = cells.get(fields.place)?;
    let (name, uncertain) = match unbracket(cell) {
      Some(inner) => {
        info!(line, "added @evidence to {}", fields.place);
        (inner.trim(), true)
      }
      None => (cell, false),
    };
    let reference = cells.get(fields.place_id).and_then(|raw| {
      let uri = authority::place_uri(raw);
      if uri.is_none() {
        self.diagnostics.push(line, Some(fields.place_id), DiagnosticKind::NonGeonamesPlace {
          raw: raw.to_string(),
        });
      }
      uri
    });
    Some(PlaceRef {
      name: name.to_string(),
      uncertain,
      reference,
    })
  }

  fn date(&mut self, cells: &Cells, field: Field, line: u64) -> TemporalValue {
    let Some(raw) = cells.get(field) else {
      return TemporalValue::Unknown;
    };
    match date::parse(raw) {
      Ok(value) => value,
      Err(e) => {
        self.diagnostics.push(line, Some(field), DiagnosticKind::UnparseableDate {
          raw:    raw.to_string(),
          reason: e.to_string(),
        });
        TemporalValue::Unknown
      }
    }
  }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use cmif_core::{date::interpret, letter::NameKind};

  use super::*;

  const ALL_COLUMNS: [&str; 13] = [
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

  fn builder(options: BuildOptions) -> RecordBuilder {
    RecordBuilder::new(ColumnMap::from_headers(ALL_COLUMNS).unwrap(), options)
  }

  fn letter(outcome: RowOutcome) -> Letter {
    match outcome {
      RowOutcome::Letter(letter) => letter,
      RowOutcome::Dropped(reason) => panic!("row dropped: {reason:?}"),
    }
  }

  // ── Correspondents ─────────────────────────────────────────────────────────

  #[test]
  fn multiple_senders_get_own_ids() {
    let mut b = builder(BuildOptions::default());
    let cells = Cells::from_pairs([
      (Field::Sender, "Schmidt;Müller"),
      (Field::SenderId, "https://d-nb.info/gnd/1;https://d-nb.info/gnd/2"),
      (Field::Edition, "Briefe"),
    ]);
    let letter = letter(b.build(&cells, 2));
    let persons = &letter.sent.unwrap().persons;
    assert_eq!(persons.len(), 2);
    assert_eq!(persons[0].name, "Schmidt");
    assert_eq!(persons[0].reference.as_deref(), Some("https://d-nb.info/gnd/1"));
    assert_eq!(persons[1].name, "Müller");
    assert_eq!(persons[1].reference.as_deref(), Some("https://d-nb.info/gnd/2"));
    assert!(letter.received.is_none());
    assert!(b.diagnostics().is_empty());
  }

  #[test]
  fn bracketed_name_is_uncertain() {
    let mut b = builder(BuildOptions::default());
    let cells = Cells::from_pairs([
      (Field::Addressee, "[Goethe]"),
      (Field::AddresseeId, "118540238"),
      (Field::Edition, "Briefe"),
    ]);
    let received = letter(b.build(&cells, 2)).received.unwrap();
    assert_eq!(received.persons[0].name, "Goethe");
    assert!(received.persons[0].uncertain);
    assert_eq!(
      received.persons[0].reference.as_deref(),
      Some("https://d-nb.info/gnd/118540238")
    );
    assert_eq!(received.persons[0].kind, NameKind::Person);
  }

  #[test]
  fn id_mismatch_is_warned_not_fatal() {
    let mut b = builder(BuildOptions::default());
    let cells = Cells::from_pairs([
      (Field::Sender, "A;B"),
      (Field::SenderId, "https://d-nb.info/gnd/2024519-9"),
      (Field::Edition, "Briefe"),
    ]);
    let sent = letter(b.build(&cells, 5)).sent.unwrap();
    assert_eq!(sent.persons[0].kind, NameKind::Org);
    assert_eq!(sent.persons[1].reference, None);
    let d: Vec<_> = b.diagnostics().for_line(5).collect();
    assert_eq!(d.len(), 1);
    assert_eq!(d[0].kind, DiagnosticKind::IdCountMismatch { names: 2, ids: 1 });
  }

  #[test]
  fn custom_delimiter() {
    let mut b = builder(BuildOptions {
      delimiter: "|".into(),
      ..BuildOptions::default()
    });
    let cells = Cells::from_pairs([(Field::Sender, "A; B|C"), (Field::Edition, "E")]);
    let sent = letter(b.build(&cells, 2)).sent.unwrap();
    let names: Vec<_> = sent.persons.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["A; B", "C"]);
  }

  // ── Places and dates ───────────────────────────────────────────────────────

  #[test]
  fn place_and_date() {
    let mut b = builder(BuildOptions::default());
    let cells = Cells::from_pairs([
      (Field::Sender, "A"),
      (Field::SenderPlace, "[Leipzig]"),
      (Field::SenderPlaceId, "https://www.geonames.org/2879139"),
      (Field::SenderDate, "1850/"),
      (Field::Edition, "E"),
    ]);
    let sent = letter(b.build(&cells, 2)).sent.unwrap();
    let place = sent.place.unwrap();
    assert_eq!(place.name, "Leipzig");
    assert!(place.uncertain);
    assert_eq!(place.reference.as_deref(), Some("https://www.geonames.org/2879139"));
    assert_eq!(sent.date, interpret("1850/"));
  }

  #[test]
  fn bad_place_id_and_date_are_dropped_with_diagnostics() {
    let mut b = builder(BuildOptions::default());
    let cells = Cells::from_pairs([
      (Field::Addressee, "A"),
      (Field::AddresseePlace, "Berlin"),
      (Field::AddresseePlaceId, "https://www.wikidata.org/wiki/Q64"),
      (Field::AddresseeDate, "next spring"),
      (Field::Edition, "E"),
    ]);
    let received = letter(b.build(&cells, 9)).received.unwrap();
    assert_eq!(received.place.unwrap().reference, None);
    assert_eq!(received.date, TemporalValue::Unknown);
    let fields: Vec<_> = b.diagnostics().for_line(9).map(|d| d.field).collect();
    assert_eq!(fields, [Some(Field::AddresseePlaceId), Some(Field::AddresseeDate)]);
  }

  // ── Editions ───────────────────────────────────────────────────────────────

  #[test]
  fn identical_editions_share_keys_in_order() {
    let mut b = builder(BuildOptions::default());
    let row = |edition| Cells::from_pairs([(Field::Sender, "A"), (Field::Edition, edition)]);
    let first = letter(b.build(&row("Briefwechsel, Bd. 1, S. 12"), 2));
    let second = letter(b.build(&row("Briefwechsel, Bd. 1, S. 12"), 3));
    let third = letter(b.build(&row("Briefwechsel, Bd. 2"), 4));
    assert_eq!(first.edition, second.edition);
    assert_ne!(first.edition, third.edition);
    let keys: Vec<_> = b.bibliography().entries().iter().map(|e| Some(e.key.clone())).collect();
    assert_eq!(keys, [first.edition, third.edition]);
  }

  #[test]
  fn unedited_rows_excluded_by_default() {
    let mut b = builder(BuildOptions::default());
    let cells = Cells::from_pairs([(Field::Sender, "A")]);
    assert_eq!(b.build(&cells, 2), RowOutcome::Dropped(DropReason::Unedited));
    assert!(b.diagnostics().is_empty());
    assert_eq!(b.stats().unedited, 1);
  }

  #[test]
  fn include_all_keeps_unedited_rows() {
    let mut b = builder(BuildOptions {
      include_unedited: true,
      ..BuildOptions::default()
    });
    let cells = Cells::from_pairs([(Field::Sender, "A"), (Field::Key, "12")]);
    let letter = letter(b.build(&cells, 2));
    assert_eq!(letter.edition, None);
    // no edition and no catalogue default: the key has nothing to refer to
    assert_eq!(letter.key, None);
    assert_eq!(b.diagnostics().len(), 1);
  }

  #[test]
  fn missing_edition_column_uses_default() {
    let map = ColumnMap::from_headers(["sender", "addressee", "key"]).unwrap();
    let mut b = RecordBuilder::new(map, BuildOptions {
      default_edition: true,
      ..BuildOptions::default()
    });
    let cells = Cells::from_pairs([(Field::Sender, "A"), (Field::Key, "12")]);
    let letter = letter(b.build(&cells, 2));
    assert_eq!(letter.edition, None);
    assert_eq!(letter.key.as_deref(), Some("12"));
    assert!(b.bibliography().is_empty());
  }

  // ── Dropped rows ───────────────────────────────────────────────────────────

  #[test]
  fn row_without_correspondents_gives_one_diagnostic() {
    let mut b = builder(BuildOptions::default());
    let cells = Cells::from_pairs([
      (Field::SenderDate, "not a date"),
      (Field::SenderPlace, "Berlin"),
      (Field::Edition, "E"),
    ]);
    assert_eq!(b.build(&cells, 4), RowOutcome::Dropped(DropReason::NoCorrespondents));
    let d: Vec<_> = b.diagnostics().iter().collect();
    assert_eq!(d.len(), 1);
    assert_eq!(d[0].line, 4);
    assert_eq!(d[0].kind, DiagnosticKind::NoCorrespondents);
    assert!(b.bibliography().is_empty());
  }

  #[test]
  fn empty_unedited_row_is_reported_once() {
    let map = ColumnMap::from_headers(["sender", "addressee", "edition"]).unwrap();
    let mut b = RecordBuilder::new(map, BuildOptions::default());
    let cells = Cells::from_pairs([(Field::Sender, ""), (Field::Addressee, " ; ")]);
    assert_eq!(b.build(&cells, 7), RowOutcome::Dropped(DropReason::NoCorrespondents));
    let d: Vec<_> = b.diagnostics().iter().collect();
    assert_eq!(d.len(), 1);
    assert_eq!(d[0].line, 7);
    assert_eq!(d[0].kind, DiagnosticKind::NoCorrespondents);
    assert_eq!(b.stats().empty, 1);
    assert_eq!(b.stats().unedited, 0);
  }

  #[test]
  fn notes_can_be_left_out() {
    let cells = Cells::from_pairs([
      (Field::Sender, "A"),
      (Field::Edition, "E"),
      (Field::Note, "mit Beilage"),
    ]);
    let mut with = builder(BuildOptions::default());
    assert_eq!(letter(with.build(&cells, 2)).note.as_deref(), Some("mit Beilage"));
    let mut without = builder(BuildOptions {
      notes: false,
      ..BuildOptions::default()
    });
    assert_eq!(letter(without.build(&cells, 2)).note, None);
  }

  #[test]
  fn line_numbers_only_when_requested() {
    let cells = Cells::from_pairs([(Field::Sender, "A"), (Field::Edition, "E")]);
    let mut plain = builder(BuildOptions::default());
    assert_eq!(letter(plain.build(&cells, 3)).line_number, None);
    let mut numbered = builder(BuildOptions {
      line_numbers: true,
      ..BuildOptions::default()
    });
    assert_eq!(letter(numbered.build(&cells, 3)).line_number, Some(3));
  }

  #[test]
  fn builds_from_raw_record() {
    let map = ColumnMap::from_headers(["sender", "addressee", "edition", "note"]).unwrap();
    let mut b = RecordBuilder::new(map, BuildOptions::default());
    let record = StringRecord::from(vec!["A", " B ", "E", "postscript"]);
    let letter = letter(b.build_record(&record, 2));
    assert_eq!(letter.received.unwrap().persons[0].name, "B");
    assert_eq!(letter.note.as_deref(), Some("postscript"));
    assert_eq!(b.stats().letters, 1);
  }
}
