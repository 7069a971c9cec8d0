//! `correspDesc` serialization.

use std::io::{Cursor, Write};

use cmif_core::{
  date::TemporalValue,
  letter::{
    ActionType, CERT_VALUE, CorrespAction, EVIDENCE_VALUE, Letter, PersonRef,
    PlaceRef,
  },
};
use quick_xml::{
  Writer,
  events::{BytesEnd, BytesStart, BytesText, Event},
};

use crate::error::{Error, Result};

/// Serialize one letter as a minified `correspDesc` fragment.
pub fn encode(letter: &Letter) -> Result<String> {
  let mut writer = Writer::new(Cursor::new(Vec::new()));
  write_letter(&mut writer, letter)?;
  String::from_utf8(writer.into_inner().into_inner()).map_err(Error::xml)
}

pub(crate) fn write_letter<W: Write>(w: &mut Writer<W>, letter: &Letter) -> Result<()> {
  let mut desc = BytesStart::new("correspDesc");
  if let Some(edition) = &letter.edition {
    desc.push_attribute(("source", format!("#{edition}").as_str()));
  }
  if let Some(key) = &letter.key {
    let name = if letter.key_is_link() { "ref" } else { "key" };
    desc.push_attribute((name, key.as_str()));
  }
  if let Some(n) = letter.line_number {
    desc.push_attribute(("n", n.to_string().as_str()));
  }
  emit(w, Event::Start(desc))?;

  for side in [ActionType::Sent, ActionType::Received] {
    if let Some(action) = letter.action(side) {
      write_action(w, side, action)?;
    }
  }
  if let Some(note) = &letter.note {
    write_text_elem(w, BytesStart::new("note"), note)?;
  }

  emit(w, Event::End(BytesEnd::new("correspDesc")))
}

fn write_action<W: Write>(
  w: &mut Writer<W>,
  side: ActionType,
  action: &CorrespAction,
) -> Result<()> {
  let mut start = BytesStart::new("correspAction");
  start.push_attribute(("type", side.as_str()));
  emit(w, Event::Start(start))?;

  for person in &action.persons {
    write_person(w, person)?;
  }
  if let Some(place) = &action.place {
    write_place(w, place)?;
  }
  write_date(w, &action.date)?;

  emit(w, Event::End(BytesEnd::new("correspAction")))
}

fn write_person<W: Write>(w: &mut Writer<W>, person: &PersonRef) -> Result<()> {
  let el = referenced(person.kind.tag(), person.reference.as_deref(), person.uncertain);
  write_text_elem(w, el, &person.name)
}

fn write_place<W: Write>(w: &mut Writer<W>, place: &PlaceRef) -> Result<()> {
  let el = referenced("placeName", place.reference.as_deref(), place.uncertain);
  write_text_elem(w, el, &place.name)
}

fn write_date<W: Write>(w: &mut Writer<W>, date: &TemporalValue) -> Result<()> {
  let attrs = date.to_attributes();
  if attrs.is_empty() {
    return Ok(());
  }
  let mut el = BytesStart::new("date");
  for pair in attrs.pairs() {
    el.push_attribute(pair);
  }
  emit(w, Event::Empty(el))
}

/// Start tag with `@ref` and the conjecture attributes as needed.
fn referenced<'a>(tag: &'a str, reference: Option<&str>, uncertain: bool) -> BytesStart<'a> {
  let mut el = BytesStart::new(tag);
  if let Some(reference) = reference {
    el.push_attribute(("ref", reference));
  }
  if uncertain {
    el.push_attribute(("cert", CERT_VALUE));
    el.push_attribute(("evidence", EVIDENCE_VALUE));
  }
  el
}

// ─── Writer helpers ──────────────────────────────────────────────────────────

pub(crate) fn emit<W: Write>(w: &mut Writer<W>, event: Event<'_>) -> Result<()> {
  w.write_event(event).map_err(Error::xml)
}

pub(crate) fn write_text_elem<W: Write>(
  w: &mut Writer<W>,
  start: BytesStart<'_>,
  text: &str,
) -> Result<()> {
  let end = start.to_end().into_owned();
  emit(w, Event::Start(start))?;
  emit(w, Event::Text(BytesText::new(text)))?;
  emit(w, Event::End(end))
}
