//! Reading letters back out of CMIF documents.
//!
//! A single forward pass over the event stream. `bibl` entries are gathered
//! from `sourceDesc` and resolved against each letter's `@source` once the
//! whole document has been read, so their position in the file is free.

use cmif_core::{
  date::{DateAttributes, TemporalValue},
  flat::FlatRow,
  letter::{
    ActionType, BiblKey, CorrespAction, Letter, NameKind, PersonRef, PlaceRef,
  },
};
use quick_xml::{
  Reader,
  events::{BytesStart, Event},
};
use tracing::{debug, warn};

use crate::error::{Error, Result};

// ─── Decoded document ────────────────────────────────────────────────────────

/// One `<bibl>` from `sourceDesc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
  /// `xml:id`; the catalogue default has none.
  pub id:   Option<String>,
  pub text: String,
}

#[derive(Debug, Default)]
pub struct DecodedDocument {
  pub sources: Vec<SourceEntry>,
  pub letters: Vec<Letter>,
}

impl DecodedDocument {
  /// The catalogue default: the first `<bibl>` without `xml:id`.
  pub fn default_source(&self) -> Option<&str> {
    self
      .sources
      .iter()
      .find(|s| s.id.is_none())
      .map(|s| s.text.as_str())
  }

  /// Bibliographic text cited by `letter`, or the catalogue default.
  pub fn edition_text(&self, letter: &Letter) -> &str {
    let Some(key) = &letter.edition else {
      return self.default_source().unwrap_or_default();
    };
    match self.sources.iter().find(|s| s.id.as_deref() == Some(key.as_str())) {
      Some(source) => source.text.as_str(),
      None => {
        warn!(%key, "@source points at no bibl");
        ""
      }
    }
  }

  /// One flat row per letter, in document order.
  pub fn rows(&self, delimiter: &str) -> Vec<FlatRow> {
    self
      .letters
      .iter()
      .map(|letter| FlatRow::from_letter(letter, self.edition_text(letter), delimiter))
      .collect()
  }
}

/// Decode a single `correspDesc` fragment.
pub fn decode(fragment: &str) -> Result<Letter> {
  decode_document(fragment)?
    .letters
    .into_iter()
    .next()
    .ok_or(Error::MissingElement("correspDesc"))
}

/// Decode every `correspDesc` and `bibl` in `xml`.
pub fn decode_document(xml: &str) -> Result<DecodedDocument> {
  let mut reader = Reader::from_str(xml);
  let mut decoder = Decoder::default();

  loop {
    match reader.read_event().map_err(Error::xml)? {
      Event::Start(ref e) => decoder.start(e, false)?,
      Event::Empty(ref e) => decoder.start(e, true)?,
      Event::End(ref e) => decoder.end(e.local_name().as_ref()),
      Event::Text(ref t) => decoder.text(&t.unescape().map_err(Error::xml)?),
      Event::CData(ref t) => decoder.text(&String::from_utf8_lossy(t)),
      Event::Eof => break,
      _ => {}
    }
  }

  decoder.finish()
}

// ─── Decoder state ───────────────────────────────────────────────────────────

/// An element whose text content is being collected.
#[derive(Debug)]
enum Target {
  Bibl { id: Option<String> },
  Name { kind: NameKind, reference: Option<String>, uncertain: bool },
  Place { reference: Option<String>, uncertain: bool },
  Note,
}

#[derive(Debug)]
struct Capture {
  target: Target,
  /// Nesting depth of child elements inside the captured one.
  depth:  usize,
  text:   String,
}

#[derive(Debug, Default)]
struct Decoder {
  in_source_desc: bool,
  letter:         Option<Letter>,
  action:         Option<ActionType>,
  capture:        Option<Capture>,
  document:       DecodedDocument,
}

impl Decoder {
  fn start(&mut self, e: &BytesStart<'_>, empty: bool) -> Result<()> {
    if let Some(capture) = &mut self.capture {
      if !empty {
        capture.depth += 1;
      }
      return Ok(());
    }

    let attrs = Attrs::read(e)?;
    let target = match e.local_name().as_ref() {
      b"sourceDesc" => {
        self.in_source_desc = !empty;
        None
      }
      b"bibl" if self.in_source_desc => Some(Target::Bibl { id: attrs.get("xml:id") }),
      b"correspDesc" => {
        let letter = letter_from(&attrs);
        if empty {
          self.document.letters.push(letter);
        } else {
          self.letter = Some(letter);
        }
        None
      }
      b"correspAction" if self.letter.is_some() => {
        let action = attrs.get("type").and_then(|t| ActionType::from_attr(&t));
        if action.is_none() {
          debug!("correspAction without sent/received type skipped");
        }
        self.action = action;
        self.current_action();
        if empty {
          self.action = None;
        }
        None
      }
      tag @ (b"persName" | b"orgName" | b"name") if self.action.is_some() => {
        let tag = String::from_utf8_lossy(tag);
        Some(Target::Name {
          kind:      NameKind::from_tag(&tag).unwrap_or_default(),
          reference: attrs.get("ref"),
          uncertain: attrs.uncertain(),
        })
      }
      b"placeName" if self.action.is_some() => Some(Target::Place {
        reference: attrs.get("ref"),
        uncertain: attrs.uncertain(),
      }),
      b"date" if self.action.is_some() => {
        let date = match date_from(&attrs) {
          Ok(date) => date,
          Err(e) => {
            warn!("{e}");
            TemporalValue::Unknown
          }
        };
        if let Some(action) = self.current_action() {
          action.date = date;
        }
        None
      }
      b"note" if self.letter.is_some() => Some(Target::Note),
      _ => None,
    };

    if let Some(target) = target {
      let capture = Capture {
        target,
        depth: 0,
        text: String::new(),
      };
      if empty {
        self.complete(capture);
      } else {
        self.capture = Some(capture);
      }
    }
    Ok(())
  }

  fn end(&mut self, local: &[u8]) {
    if let Some(capture) = &mut self.capture {
      if capture.depth > 0 {
        capture.depth -= 1;
        return;
      }
      if let Some(capture) = self.capture.take() {
        self.complete(capture);
      }
      return;
    }

    match local {
      b"sourceDesc" => self.in_source_desc = false,
      b"correspAction" => self.action = None,
      b"correspDesc" => {
        self.action = None;
        if let Some(letter) = self.letter.take() {
          self.document.letters.push(letter);
        }
      }
      _ => {}
    }
  }

  fn text(&mut self, text: &str) {
    if let Some(capture) = &mut self.capture {
      capture.text.push_str(text);
    }
  }

  fn complete(&mut self, capture: Capture) {
    // notes keep their line breaks
    let text = match capture.target {
      Target::Note => capture.text.trim().to_string(),
      _ => normalize(&capture.text),
    };
    match capture.target {
      Target::Bibl { id } => self.document.sources.push(SourceEntry { id, text }),
      Target::Name {
        kind,
        reference,
        uncertain,
      } => {
        if let Some(action) = self.current_action() {
          action.persons.push(PersonRef {
            name: text,
            uncertain,
            reference,
            kind,
          });
        }
      }
      Target::Place {
        reference,
        uncertain,
      } => {
        if let Some(action) = self.current_action() {
          if action.place.is_some() {
            debug!(place = %text, "additional placeName ignored");
          } else {
            action.place = Some(PlaceRef {
              name: text,
              uncertain,
              reference,
            });
          }
        }
      }
      Target::Note => {
        if let Some(letter) = &mut self.letter {
          letter.note = (!text.is_empty()).then_some(text);
        }
      }
    }
  }

  /// The action being read, created on first use.
  fn current_action(&mut self) -> Option<&mut CorrespAction> {
    let side = self.action?;
    let letter = self.letter.as_mut()?;
    Some(letter.action_mut(side).get_or_insert_with(CorrespAction::default))
  }

  fn finish(self) -> Result<DecodedDocument> {
    if self.letter.is_some() {
      return Err(Error::Xml("unclosed <correspDesc>".into()));
    }
    Ok(self.document)
  }
}

// ─── Attributes ──────────────────────────────────────────────────────────────

/// Unescaped attributes of one element, keyed by their qualified name.
struct Attrs(Vec<(String, String)>);

impl Attrs {
  fn read(e: &BytesStart<'_>) -> Result<Self> {
    let mut pairs = Vec::new();
    for attr in e.attributes() {
      let attr = attr.map_err(Error::xml)?;
      let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
      let value = attr.unescape_value().map_err(Error::xml)?.trim().to_string();
      pairs.push((key, value));
    }
    Ok(Self(pairs))
  }

  fn get(&self, key: &str) -> Option<String> {
    self
      .0
      .iter()
      .find(|(k, v)| k == key && !v.is_empty())
      .map(|(_, v)| v.clone())
  }

  /// `@cert` below "high", or any `@evidence`.
  fn uncertain(&self) -> bool {
    self.get("cert").is_some_and(|c| c != "high") || self.get("evidence").is_some()
  }
}

fn letter_from(attrs: &Attrs) -> Letter {
  let mut sources = attrs
    .get("source")
    .into_iter()
    .flat_map(|s| {
      s.split_whitespace()
        .map(|id| id.trim_start_matches('#').to_string())
        .collect::<Vec<_>>()
    });
  let edition = sources.next().map(BiblKey::new);
  let extra = sources.count();
  if extra > 0 {
    warn!(extra, "only the first @source of a letter is kept");
  }

  Letter {
    edition,
    key: attrs.get("key").or_else(|| attrs.get("ref")),
    line_number: attrs.get("n").and_then(|n| n.parse().ok()),
    ..Letter::default()
  }
}

fn date_from(attrs: &Attrs) -> Result<TemporalValue> {
  let date = DateAttributes {
    when:       attrs.get("when"),
    from:       attrs.get("from"),
    to:         attrs.get("to"),
    not_before: attrs.get("notBefore"),
    not_after:  attrs.get("notAfter"),
    uncertain:  attrs.uncertain(),
  };
  TemporalValue::from_attributes(&date).map_err(|source| Error::InvalidDate {
    element: "date",
    source,
  })
}

fn normalize(text: &str) -> String {
  text.split_whitespace().collect::<Vec<_>>().join(" ")
}
