//! CMIF (TEI `correspDesc`) codec for letter catalogues.
//!
//! Converts between [`cmif_core`] letters and XML. Pure synchronous; no
//! file or network access.
//!
//! # Quick start
//!
//! ```no_run
//! use cmif_xml::{decode, encode};
//!
//! let xml = "<correspDesc><correspAction type=\"sent\">\
//!            <persName>Clara Schumann</persName></correspAction></correspDesc>";
//! let letter = decode(xml).unwrap();
//! assert_eq!(encode(&letter).unwrap(), xml);
//! ```

mod decode;
pub mod document;
mod encode;
pub mod error;

pub use decode::{DecodedDocument, SourceEntry, decode, decode_document};
pub use document::{
  DocumentHeader, DocumentWriter, EditionType, Editor, License, ShortTitle,
};
pub use encode::encode;
pub use error::{Error, Result};

// ─── Round-trip test ─────────────────────────────────────────────────────────

#[cfg(test)]
mod roundtrip_tests {
  use chrono::NaiveDate;
  use cmif_core::flat::FlatRow;
  use cmif_table::{BuildOptions, LetterReader};

  use super::*;

  fn header() -> DocumentHeader {
    let date = NaiveDate::from_ymd_opt(2024, 1, 1)
      .unwrap()
      .and_hms_opt(0, 0, 0)
      .unwrap();
    DocumentHeader::new(date)
  }

  /// CSV → CMIF document → CSV rows.
  fn roundtrip(csv: &str, options: BuildOptions, header: DocumentHeader) -> Vec<FlatRow> {
    let delimiter = options.delimiter.clone();
    let mut reader = LetterReader::new(csv.as_bytes(), options).unwrap();
    let mut writer = DocumentWriter::new(header);
    while let Some(letter) = reader.next_letter().unwrap() {
      writer.push(&letter).unwrap();
    }
    let builder = reader.finish();
    let xml = writer.finish(builder.bibliography()).unwrap();
    decode_document(&xml).unwrap().rows(&delimiter)
  }

  // ── Correspondents ─────────────────────────────────────────────────────────

  #[test]
  fn names_references_places_and_dates_survive() {
    let csv = "\
sender,senderID,senderPlace,senderPlaceID,senderDate,addressee,addresseeID,addresseePlace,addresseePlaceID,addresseeDate,edition,key,note
Schmidt;Müller,https://d-nb.info/gnd/1;https://d-nb.info/gnd/2,Leipzig,https://www.geonames.org/2879139,1850-03-02,Verlag,https://d-nb.info/gnd/2024519-9,Berlin,https://www.geonames.org/2950159,1850-03-05/1850-03-09,Briefe,17,mit Beilage
";
    let rows = roundtrip(csv, BuildOptions::default(), header());
    assert_eq!(rows, vec![FlatRow {
      sender:             "Schmidt;Müller".into(),
      sender_id:          "https://d-nb.info/gnd/1;https://d-nb.info/gnd/2".into(),
      sender_place:       "Leipzig".into(),
      sender_place_id:    "https://www.geonames.org/2879139".into(),
      sender_date:        "1850-03-02".into(),
      addressee:          "Verlag".into(),
      addressee_id:       "https://d-nb.info/gnd/2024519-9".into(),
      addressee_place:    "Berlin".into(),
      addressee_place_id: "https://www.geonames.org/2950159".into(),
      addressee_date:     "1850-03-05/1850-03-09".into(),
      edition:            "Briefe".into(),
      key:                "17".into(),
      note:               "mit Beilage".into(),
    }]);
  }

  #[test]
  fn brackets_come_back_as_question_marks() {
    let csv = "\
sender,senderPlace,senderDate,addressee,addresseeDate,edition
[Goethe];Schiller,[Weimar],[1798-06-02],Cotta,[1798/1799],Briefe
";
    let rows = roundtrip(csv, BuildOptions::default(), header());
    assert_eq!(rows[0].sender, "Goethe?;Schiller");
    assert_eq!(rows[0].sender_place, "Weimar?");
    assert_eq!(rows[0].sender_date, "1798-06-02?");
    assert_eq!(rows[0].addressee_date, "1798/1799?");
  }

  #[test]
  fn question_mark_output_reads_back_the_same() {
    let csv = "\
sender,senderDate,addressee,addresseeDate,edition
A,1798-06-02?,B,1798/1799?,Briefe
";
    let rows = roundtrip(csv, BuildOptions::default(), header());
    assert_eq!(rows[0].sender_date, "1798-06-02?");
    assert_eq!(rows[0].addressee_date, "1798/1799?");
  }

  #[test]
  fn open_ranges_and_sets() {
    let csv = "\
sender,senderDate,addressee,addresseeDate,edition
A,1850/,B,[1760-12-01..1760-12-03],E
C,/1850-05,D,\"{1851,1852,1853}\",E
";
    let rows = roundtrip(csv, BuildOptions::default(), header());
    assert_eq!(rows[0].sender_date, "1850/");
    assert_eq!(rows[0].addressee_date, "[1760-12-01..1760-12-03]");
    assert_eq!(rows[1].sender_date, "/1850-05");
    assert_eq!(rows[1].addressee_date, "1851/1853");
  }

  // ── Editions ───────────────────────────────────────────────────────────────

  #[test]
  fn editions_and_catalogue_default() {
    let csv = "\
sender,addressee,key
A,B,1
C,D,http://example.org/2
";
    let mut h = header();
    h.default_edition = Some("Gesamtausgabe".into());
    let options = BuildOptions {
      default_edition: true,
      ..BuildOptions::default()
    };
    let rows = roundtrip(csv, options, h);
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.edition == "Gesamtausgabe"));
    assert_eq!(rows[1].key, "http://example.org/2");
  }

  #[test]
  fn shared_edition_text_resolves_per_letter() {
    let csv = "\
sender,addressee,edition
A,B,\"Briefwechsel, Bd. 1, S. 12\"
C,D,\"Briefwechsel, Bd. 1, S. 12\"
E,F,\"Briefwechsel, Bd. 2\"
";
    let rows = roundtrip(csv, BuildOptions::default(), header());
    let editions: Vec<_> = rows.iter().map(|r| r.edition.as_str()).collect();
    assert_eq!(editions, [
      "Briefwechsel, Bd. 1, S. 12",
      "Briefwechsel, Bd. 1, S. 12",
      "Briefwechsel, Bd. 2",
    ]);
  }

  #[test]
  fn custom_delimiter_on_both_sides() {
    let csv = "\
sender,senderID,addressee,edition
A|B,|https://d-nb.info/gnd/2,C,E
";
    let options = BuildOptions {
      delimiter: "|".into(),
      ..BuildOptions::default()
    };
    let rows = roundtrip(csv, options, header());
    assert_eq!(rows[0].sender, "A|B");
    assert_eq!(rows[0].sender_id, "|https://d-nb.info/gnd/2");
  }
}
