//! `csv2cmi.ini` project settings.
//!
//! The file is read through the `config` crate's INI format and overlaid
//! with `CSV2CMI_<SECTION>__<KEY>` environment variables. Section and key
//! names are matched case-insensitively (`fileURL` and `fileurl` are the
//! same key).
//!
//! ```ini
//! [Project]
//! title = Briefe an Clara Schumann
//! editor = Jane Doe <jane@example.org>
//!   John Roe
//! publisher = Example Press
//! fileURL = https://example.org/letters.xml
//! license = CC0-1.0
//! extra-delimiter = |
//!
//! [Edition]
//! title = Briefwechsel. Gesamtausgabe
//! type = hybrid
//!
//! [Bw]
//! title = Briefwechsel, hg. von Jane Doe, Leipzig 2020
//! ```
//!
//! Indented lines continue the previous value. Every section other than
//! `Project` and `Edition` replaces the edition text named by the section.

use std::{
  collections::HashMap,
  fs,
  path::{Path, PathBuf},
};

use cmif_xml::{EditionType, Editor, License, ShortTitle};
use config::{Config, Environment, File, FileFormat, Value};
use tracing::{debug, error, warn};

use crate::error::{Error, Result};

pub const INI_FILE: &str = "csv2cmi.ini";

const ENV_PREFIX: &str = "CSV2CMI";

const PROJECT: &str = "Project";
const EDITION: &str = "Edition";

#[derive(Debug, Clone)]
struct Section {
  name:    String,
  entries: Vec<(String, String)>,
}

impl Section {
  fn get(&self, key: &str) -> Option<&str> {
    self
      .entries
      .iter()
      .find(|(k, _)| k.eq_ignore_ascii_case(key))
      .map(|(_, v)| v.as_str())
  }

  fn set(&mut self, key: String, value: String) {
    match self.entries.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&key)) {
      Some(entry) => entry.1 = value,
      None => self.entries.push((key, value)),
    }
  }
}

/// Parsed project settings.
#[derive(Debug, Clone, Default)]
pub struct Settings {
  sections: Vec<Section>,
}

impl Settings {
  /// Settings file to use for `input`: `explicit` when given, else
  /// `csv2cmi.ini` next to the input, else in the working directory.
  pub fn locate(explicit: Option<&Path>, input: &Path) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
      if !path.is_file() {
        return Err(Error::NotFound(path.to_path_buf()));
      }
      return Ok(Some(path.to_path_buf()));
    }
    let beside = input
      .parent()
      .map(|dir| dir.join(INI_FILE))
      .filter(|p| p.is_file());
    let cwd = Some(PathBuf::from(INI_FILE)).filter(|p| p.is_file());
    Ok(beside.or(cwd))
  }

  /// Load `path` (if any) and overlay the environment.
  pub fn load(path: Option<&Path>) -> Result<Self> {
    let mut settings = match path {
      Some(path) => {
        debug!(path = %path.display(), "reading settings");
        let text = fs::read_to_string(path).map_err(Error::io(path))?;
        Self::from_ini(&text)?
      }
      None => {
        error!("no configuration file found");
        Self::default()
      }
    };
    let env = Config::builder()
      .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
      .build()?;
    settings.overlay(sections(env)?);
    Ok(settings)
  }

  /// Parse INI text.
  pub fn from_ini(text: &str) -> Result<Self> {
    let (text, names) = alias_sections(&fold_continuations(text));
    let config = Config::builder()
      .add_source(File::from_str(&text, FileFormat::Ini))
      .build()?;
    let mut sections = sections(config)?;
    for section in &mut sections {
      if let Some(name) = names.get(&section.name) {
        section.name = name.clone();
      }
    }
    let mut settings = Self::default();
    settings.overlay(sections);
    Ok(settings)
  }

  fn overlay(&mut self, sections: Vec<Section>) {
    for section in sections {
      let existing = self
        .sections
        .iter_mut()
        .find(|s| s.name.eq_ignore_ascii_case(&section.name));
      match existing {
        Some(existing) => {
          for (key, value) in section.entries {
            existing.set(key, value);
          }
        }
        None => self.sections.push(section),
      }
    }
  }

  pub fn get(&self, section: &str, key: &str) -> Option<&str> {
    self
      .sections
      .iter()
      .find(|s| s.name.eq_ignore_ascii_case(section))
      .and_then(|s| s.get(key))
      .map(str::trim)
      .filter(|v| !v.is_empty())
  }

  // ─── [Project] ─────────────────────────────────────────────────────────────

  pub fn title(&self) -> Option<&str> { self.get(PROJECT, "title") }

  pub fn editors(&self) -> Vec<Editor> {
    self
      .lines(PROJECT, "editor")
      .iter()
      .filter_map(|line| Editor::parse(line))
      .collect()
  }

  pub fn publishers(&self) -> Vec<String> { self.lines(PROJECT, "publisher") }

  pub fn file_url(&self) -> Option<&str> { self.get(PROJECT, "fileURL") }

  /// Licence; unknown identifiers fall back to CC-BY 4.0.
  pub fn license(&self) -> License {
    let Some(id) = self.get(PROJECT, "license") else {
      return License::default();
    };
    id.parse::<License>().unwrap_or_else(|e| {
      warn!("{e}, using CC-BY-4.0");
      License::default()
    })
  }

  /// Separator of several values within a cell.
  pub fn delimiter(&self) -> Result<Option<String>> {
    self
      .get(PROJECT, "extra-delimiter")
      .map(validate_delimiter)
      .transpose()
  }

  // ─── [Edition] ─────────────────────────────────────────────────────────────

  /// Bibliographic text of the catalogue-wide source.
  pub fn edition_title(&self) -> Option<&str> { self.get(EDITION, "title") }

  /// `@type` of generated `<bibl>`s; unknown values fall back to `print`.
  pub fn edition_type(&self) -> EditionType {
    self
      .get(EDITION, "type")
      .and_then(|t| t.parse::<EditionType>().map_err(|e| warn!("{e}, using print")).ok())
      .unwrap_or_default()
  }

  // ─── Short titles ──────────────────────────────────────────────────────────

  /// Every other section with a `title`, keyed by section name.
  pub fn short_titles(&self) -> HashMap<String, ShortTitle> {
    let mut titles = HashMap::new();
    for section in &self.sections {
      if [PROJECT, EDITION].iter().any(|n| n.eq_ignore_ascii_case(&section.name)) {
        continue;
      }
      let Some(title) = section.get("title").map(str::trim).filter(|t| !t.is_empty()) else {
        warn!(section = %section.name, "incomplete section, title must be set");
        continue;
      };
      let kind = section
        .get("type")
        .and_then(|t| t.parse::<EditionType>().map_err(|e| warn!(section = %section.name, "{e}")).ok());
      titles.insert(section.name.clone(), ShortTitle {
        title: title.to_string(),
        kind,
      });
    }
    titles
  }

  /// A multi-line value split into its non-empty lines.
  fn lines(&self, section: &str, key: &str) -> Vec<String> {
    self
      .get(section, key)
      .map(|v| {
        v.replace("\\n", "\n")
          .lines()
          .map(str::trim)
          .filter(|l| !l.is_empty())
          .map(str::to_string)
          .collect()
      })
      .unwrap_or_default()
  }
}

/// A delimiter must be exactly one character.
pub fn validate_delimiter(value: &str) -> Result<String> {
  match value.chars().count() {
    1 => Ok(value.to_string()),
    _ => Err(Error::Delimiter(value.to_string())),
  }
}

/// Sections of a built configuration; top-level scalars are skipped.
fn sections(config: Config) -> Result<Vec<Section>> {
  let table: HashMap<String, Value> = config.try_deserialize()?;
  let mut sections = Vec::new();
  for (name, value) in table {
    let Ok(entries) = value.into_table() else {
      debug!(key = %name, "setting outside a section ignored");
      continue;
    };
    let entries = entries
      .into_iter()
      .filter_map(|(key, value)| value.into_string().ok().map(|v| (key, v)))
      .collect();
    sections.push(Section { name, entries });
  }
  Ok(sections)
}

/// Replace section headers with plain aliases, returning alias → name.
///
/// `config` reads keys as paths, so a header such as `[Briefe Bd. 1]` would
/// otherwise be split at the period.
fn alias_sections(text: &str) -> (String, HashMap<String, String>) {
  let mut names = HashMap::new();
  let lines: Vec<String> = text
    .lines()
    .map(|line| {
      let header = line
        .trim()
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'));
      match header {
        Some(name) => {
          let alias = format!("section{}", names.len());
          names.insert(alias.clone(), name.trim().to_string());
          format!("[{alias}]")
        }
        None => line.to_string(),
      }
    })
    .collect();
  (lines.join("\n"), names)
}

/// Join indented continuation lines onto the preceding value.
fn fold_continuations(text: &str) -> String {
  let mut lines: Vec<String> = Vec::new();
  for line in text.lines() {
    let continues = line.starts_with([' ', '\t'])
      && !line.trim().is_empty()
      && lines.last().is_some_and(|prev| prev.contains('='));
    match lines.last_mut() {
      Some(prev) if continues => {
        prev.push_str("\\n");
        prev.push_str(line.trim());
      }
      _ => lines.push(line.to_string()),
    }
  }
  lines.join("\n")
}
