//! Whole-document assembly.
//!
//! A [`DocumentWriter`] collects `correspDesc` fragments as rows are
//! converted. The header's `sourceDesc` lists the bibliography, which is
//! only complete after the last row, so the document is assembled in
//! [`DocumentWriter::finish`].

use std::{
  collections::HashMap,
  fmt,
  io::{Cursor, Write},
  str::FromStr,
};

use chrono::NaiveDateTime;
use cmif_core::{bibliography::BibliographyTable, letter::Letter};
use quick_xml::{
  Writer,
  events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use tracing::warn;
use uuid::Uuid;

use crate::{
  encode::{emit, write_letter, write_text_elem},
  error::{Error, Result},
};

pub const NS_TEI: &str = "http://www.tei-c.org/ns/1.0";

/// Fallback document title.
pub const UNTITLED: &str = "untitled letters project";

/// Fallback file URL.
pub const EXAMPLE_URL: &str = "www.example.com";

const TITLE_NAMESPACE: Uuid = Uuid::from_u128(0x2f4b_91c0_7d3e_4a55_b6e8_03d9_c17a_5e42);

// ─── Header metadata ─────────────────────────────────────────────────────────

/// Licence statement in `availability`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum License {
  #[default]
  CcBy4,
  Cc0,
}

impl License {
  pub fn url(self) -> &'static str {
    match self {
      License::CcBy4 => "https://creativecommons.org/licenses/by/4.0/",
      License::Cc0   => "https://creativecommons.org/publicdomain/zero/1.0/",
    }
  }

  pub fn text(self) -> &'static str {
    match self {
      License::CcBy4 => {
        "This file is licensed under the terms of the Creative-Commons-License CC-BY 4.0."
      }
      License::Cc0 => "This file has been marked as dedicated to the public domain.",
    }
  }
}

impl FromStr for License {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim() {
      "CC-BY-4.0" => Ok(License::CcBy4),
      "CC0-1.0" => Ok(License::Cc0),
      other => Err(format!("unknown license {other:?}")),
    }
  }
}

/// `@type` of a `<bibl>`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditionType {
  #[default]
  Print,
  Hybrid,
  Online,
}

impl EditionType {
  pub fn as_str(self) -> &'static str {
    match self {
      EditionType::Print  => "print",
      EditionType::Hybrid => "hybrid",
      EditionType::Online => "online",
    }
  }
}

impl fmt::Display for EditionType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for EditionType {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim() {
      "print" => Ok(EditionType::Print),
      "hybrid" => Ok(EditionType::Hybrid),
      "online" => Ok(EditionType::Online),
      other => Err(format!("unknown edition type {other:?}")),
    }
  }
}

/// One `<editor>`: a name, a mailbox, or both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Editor {
  pub name:  Option<String>,
  pub email: Option<String>,
}

impl Editor {
  /// Parse `Name`, `Name <mail>` or a bare mail address. Blank → `None`.
  pub fn parse(line: &str) -> Option<Self> {
    let line = line.trim();
    if line.is_empty() {
      return None;
    }
    let non_empty = |s: &str| {
      let s = s.trim();
      (!s.is_empty()).then(|| s.to_string())
    };

    let mailbox = line
      .split_once('<')
      .and_then(|(name, rest)| Some((name, rest.trim_end().strip_suffix('>')?)))
      .filter(|(_, mail)| mail.contains('@'));
    if let Some((name, mail)) = mailbox {
      return Some(Self {
        name:  non_empty(name),
        email: non_empty(mail),
      });
    }
    if line.contains('@') && !line.contains(char::is_whitespace) {
      return Some(Self {
        name:  None,
        email: Some(line.to_string()),
      });
    }
    Some(Self {
      name:  Some(line.to_string()),
      email: None,
    })
  }
}

/// Replacement for a short edition title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortTitle {
  pub title: String,
  pub kind:  Option<EditionType>,
}

/// Everything in `teiHeader` that does not come from the rows.
#[derive(Debug, Clone)]
pub struct DocumentHeader {
  pub title:           String,
  pub editors:         Vec<Editor>,
  pub publishers:      Vec<String>,
  pub file_url:        String,
  pub date:            NaiveDateTime,
  pub license:         License,
  /// Text of the catalogue-wide `<bibl>`, written without `xml:id`.
  pub default_edition: Option<String>,
  pub edition_type:    EditionType,
  /// Short title → full title, keyed by the exact edition text.
  pub short_titles:    HashMap<String, ShortTitle>,
}

impl DocumentHeader {
  pub fn new(date: NaiveDateTime) -> Self {
    Self {
      title: UNTITLED.to_string(),
      editors: Vec::new(),
      publishers: Vec::new(),
      file_url: EXAMPLE_URL.to_string(),
      date,
      license: License::default(),
      default_edition: None,
      edition_type: EditionType::default(),
      short_titles: HashMap::new(),
    }
  }

  /// Stable `xml:id` for the document title.
  pub fn title_id(&self) -> String {
    let uuid = Uuid::new_v5(&TITLE_NAMESPACE, self.title.as_bytes());
    format!("title-{}", &uuid.simple().to_string()[..8])
  }

  /// Displayed text and type of an edition, after short-title replacement.
  /// Short titles match exactly, or else ignoring ASCII case.
  fn edition<'a>(&'a self, text: &'a str) -> (&'a str, EditionType) {
    let full = self.short_titles.get(text).or_else(|| {
      self
        .short_titles
        .iter()
        .find(|(short, _)| short.eq_ignore_ascii_case(text))
        .map(|(_, full)| full)
    });
    match full {
      Some(full) => (&full.title, full.kind.unwrap_or(self.edition_type)),
      None => (text, self.edition_type),
    }
  }
}

// ─── Document writer ─────────────────────────────────────────────────────────

pub struct DocumentWriter {
  header:  DocumentHeader,
  body:    Writer<Vec<u8>>,
  letters: usize,
}

impl DocumentWriter {
  pub fn new(header: DocumentHeader) -> Self {
    Self {
      header,
      body: Writer::new(Vec::new()),
      letters: 0,
    }
  }

  pub fn header(&self) -> &DocumentHeader { &self.header }

  /// Number of letters appended so far.
  pub fn len(&self) -> usize { self.letters }

  pub fn is_empty(&self) -> bool { self.letters == 0 }

  /// Append one letter to `profileDesc`.
  pub fn push(&mut self, letter: &Letter) -> Result<()> {
    write_letter(&mut self.body, letter)?;
    self.letters += 1;
    Ok(())
  }

  /// Assemble the document, listing `bibliography` in `sourceDesc`.
  pub fn finish(self, bibliography: &BibliographyTable) -> Result<String> {
    let mut w = Writer::new(Cursor::new(Vec::new()));
    emit(&mut w, Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut tei = BytesStart::new("TEI");
    tei.push_attribute(("xmlns", NS_TEI));
    emit(&mut w, Event::Start(tei))?;
    let comment = format!(" Generated with csv2cmi {} ", env!("CARGO_PKG_VERSION"));
    emit(&mut w, Event::Comment(BytesText::new(&comment)))?;

    start(&mut w, "teiHeader")?;
    start(&mut w, "fileDesc")?;
    self.write_title_stmt(&mut w)?;
    self.write_publication_stmt(&mut w)?;
    self.write_source_desc(&mut w, bibliography)?;
    end(&mut w, "fileDesc")?;

    if self.letters == 0 {
      emit(&mut w, Event::Empty(BytesStart::new("profileDesc")))?;
    } else {
      start(&mut w, "profileDesc")?;
      w.get_mut().write_all(&self.body.into_inner()).map_err(Error::xml)?;
      end(&mut w, "profileDesc")?;
    }
    end(&mut w, "teiHeader")?;

    start(&mut w, "text")?;
    start(&mut w, "body")?;
    emit(&mut w, Event::Empty(BytesStart::new("p")))?;
    end(&mut w, "body")?;
    end(&mut w, "text")?;
    end(&mut w, "TEI")?;

    String::from_utf8(w.into_inner().into_inner()).map_err(Error::xml)
  }

  fn write_title_stmt<W: Write>(&self, w: &mut Writer<W>) -> Result<()> {
    start(w, "titleStmt")?;
    let mut title = BytesStart::new("title");
    let title_id = self.header.title_id();
    title.push_attribute(("xml:id", title_id.as_str()));
    write_text_elem(w, title, &self.header.title)?;

    if self.header.editors.is_empty() {
      warn!("editor missing");
      emit(w, Event::Empty(BytesStart::new("editor")))?;
    }
    for editor in &self.header.editors {
      start(w, "editor")?;
      if let Some(name) = &editor.name {
        emit(w, Event::Text(BytesText::new(name)))?;
      }
      if let Some(email) = &editor.email {
        write_text_elem(w, BytesStart::new("email"), email)?;
      }
      end(w, "editor")?;
    }
    end(w, "titleStmt")
  }

  fn write_publication_stmt<W: Write>(&self, w: &mut Writer<W>) -> Result<()> {
    start(w, "publicationStmt")?;
    if self.header.publishers.is_empty() {
      for name in self.header.editors.iter().filter_map(|e| e.name.as_deref()) {
        write_text_elem(w, BytesStart::new("publisher"), name)?;
      }
    }
    for publisher in &self.header.publishers {
      write_text_elem(w, BytesStart::new("publisher"), publisher)?;
    }

    let mut idno = BytesStart::new("idno");
    idno.push_attribute(("type", "url"));
    write_text_elem(w, idno, &self.header.file_url)?;

    let mut date = BytesStart::new("date");
    let when = self.header.date.format("%Y-%m-%dT%H:%M:%S").to_string();
    date.push_attribute(("when", when.as_str()));
    emit(w, Event::Empty(date))?;

    start(w, "availability")?;
    let mut licence = BytesStart::new("licence");
    licence.push_attribute(("target", self.header.license.url()));
    write_text_elem(w, licence, self.header.license.text())?;
    end(w, "availability")?;
    end(w, "publicationStmt")
  }

  fn write_source_desc<W: Write>(
    &self,
    w: &mut Writer<W>,
    bibliography: &BibliographyTable,
  ) -> Result<()> {
    if self.header.default_edition.is_none() && bibliography.is_empty() {
      return emit(w, Event::Empty(BytesStart::new("sourceDesc")));
    }
    start(w, "sourceDesc")?;
    if let Some(text) = &self.header.default_edition {
      self.write_bibl(w, text, None)?;
    }
    for entry in bibliography.entries() {
      self.write_bibl(w, &entry.text, Some(entry.key.as_str()))?;
    }
    end(w, "sourceDesc")
  }

  fn write_bibl<W: Write>(&self, w: &mut Writer<W>, text: &str, id: Option<&str>) -> Result<()> {
    let (text, kind) = self.header.edition(text);
    let mut bibl = BytesStart::new("bibl");
    bibl.push_attribute(("type", kind.as_str()));
    if let Some(id) = id {
      bibl.push_attribute(("xml:id", id));
    }
    write_text_elem(w, bibl, text)
  }
}

fn start<W: Write>(w: &mut Writer<W>, tag: &str) -> Result<()> {
  emit(w, Event::Start(BytesStart::new(tag)))
}

fn end<W: Write>(w: &mut Writer<W>, tag: &str) -> Result<()> {
  emit(w, Event::End(BytesEnd::new(tag)))
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use cmif_core::letter::{CorrespAction, PersonRef};

  use super::*;

  fn header() -> DocumentHeader {
    let date = NaiveDate::from_ymd_opt(2024, 5, 1)
      .unwrap()
      .and_hms_opt(12, 30, 0)
      .unwrap();
    DocumentHeader::new(date)
  }

  fn letter(name: &str) -> Letter {
    Letter {
      sent: Some(CorrespAction {
        persons: vec![PersonRef::new(name, false, None)],
        ..CorrespAction::default()
      }),
      ..Letter::default()
    }
  }

  // ── Header ─────────────────────────────────────────────────────────────────

  #[test]
  fn editor_lines() {
    assert_eq!(Editor::parse("  "), None);
    assert_eq!(Editor::parse("Jane Doe"), Some(Editor {
      name:  Some("Jane Doe".into()),
      email: None,
    }));
    assert_eq!(Editor::parse("Jane Doe <jane@example.org>"), Some(Editor {
      name:  Some("Jane Doe".into()),
      email: Some("jane@example.org".into()),
    }));
    assert_eq!(Editor::parse("jane@example.org"), Some(Editor {
      name:  None,
      email: Some("jane@example.org".into()),
    }));
  }

  #[test]
  fn license_ids() {
    assert_eq!("CC0-1.0".parse::<License>(), Ok(License::Cc0));
    assert_eq!("CC-BY-4.0".parse::<License>(), Ok(License::CcBy4));
    assert!("MIT".parse::<License>().is_err());
  }

  #[test]
  fn title_id_is_stable() {
    let a = header();
    let mut b = header();
    assert_eq!(a.title_id(), b.title_id());
    b.title = "Briefe".into();
    assert_ne!(a.title_id(), b.title_id());
    assert!(a.title_id().starts_with("title-"));
  }

  #[test]
  fn header_structure() {
    let mut h = header();
    h.title = "Briefe".into();
    h.editors = vec![Editor::parse("Jane Doe <jane@example.org>").unwrap()];
    h.license = License::Cc0;
    let xml = DocumentWriter::new(h).finish(&BibliographyTable::new()).unwrap();

    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?><TEI xmlns=\"http://www.tei-c.org/ns/1.0\"><!--"));
    assert!(xml.contains("<editor>Jane Doe<email>jane@example.org</email></editor>"));
    assert!(xml.contains("<publisher>Jane Doe</publisher>"));
    assert!(xml.contains("<idno type=\"url\">www.example.com</idno>"));
    assert!(xml.contains("<date when=\"2024-05-01T12:30:00\"/>"));
    assert!(xml.contains("<licence target=\"https://creativecommons.org/publicdomain/zero/1.0/\">"));
    assert!(xml.contains("<sourceDesc/>"));
    assert!(xml.contains("<profileDesc/>"));
    assert!(xml.ends_with("<text><body><p/></body></text></TEI>"));
  }

  #[test]
  fn missing_editor_leaves_empty_element() {
    let xml = DocumentWriter::new(header()).finish(&BibliographyTable::new()).unwrap();
    assert!(xml.contains("<editor/></titleStmt>"));
    assert!(xml.contains(&format!("<title xml:id=\"{}\">{UNTITLED}</title>", header().title_id())));
  }

  // ── sourceDesc ─────────────────────────────────────────────────────────────

  #[test]
  fn default_bibl_precedes_generated_ones() {
    let mut h = header();
    h.default_edition = Some("Gesamtausgabe".into());
    h.edition_type = EditionType::Hybrid;
    let mut bibliography = BibliographyTable::new();
    let key = bibliography.key_for("Bd. 1").unwrap();

    let xml = DocumentWriter::new(h).finish(&bibliography).unwrap();
    assert!(xml.contains(&format!(
      "<sourceDesc><bibl type=\"hybrid\">Gesamtausgabe</bibl>\
       <bibl type=\"hybrid\" xml:id=\"{key}\">Bd. 1</bibl></sourceDesc>"
    )));
  }

  #[test]
  fn short_titles_are_replaced() {
    let mut h = header();
    h.short_titles.insert("Bw".into(), ShortTitle {
      title: "Briefwechsel, hg. von X".into(),
      kind:  Some(EditionType::Online),
    });
    let mut bibliography = BibliographyTable::new();
    let key = bibliography.key_for("Bw").unwrap();
    let xml = DocumentWriter::new(h).finish(&bibliography).unwrap();
    assert!(xml.contains(&format!(
      "<bibl type=\"online\" xml:id=\"{key}\">Briefwechsel, hg. von X</bibl>"
    )));
  }

  // ── profileDesc ────────────────────────────────────────────────────────────

  #[test]
  fn letters_keep_input_order() {
    let mut writer = DocumentWriter::new(header());
    for name in ["First", "Second", "Third"] {
      writer.push(&letter(name)).unwrap();
    }
    assert_eq!(writer.len(), 3);
    let xml = writer.finish(&BibliographyTable::new()).unwrap();
    let first = xml.find("First").unwrap();
    let second = xml.find("Second").unwrap();
    let third = xml.find("Third").unwrap();
    assert!(first < second && second < third);
    assert!(xml.contains("<profileDesc><correspDesc>"));
    assert!(xml.contains("</correspDesc></profileDesc></teiHeader>"));
  }
}
