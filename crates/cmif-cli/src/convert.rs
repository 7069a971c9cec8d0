//! One conversion run in either direction.

use std::{
  fs::{self, File},
  io::BufReader,
  path::{Path, PathBuf},
};

use chrono::NaiveDateTime;
use cmif_core::DEFAULT_DELIMITER;
use cmif_table::{BuildOptions, BuildStats, Field, LetterReader, write_rows};
use cmif_xml::{DocumentHeader, DocumentWriter, License, decode_document};
use tracing::{info, warn};

use crate::{
  error::{Error, Result},
  settings::{Settings, validate_delimiter},
};

// ─── CSV → CMIF ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct ForwardOptions {
  pub input:        PathBuf,
  /// Defaults to the input path with an `.xml` extension.
  pub output:       Option<PathBuf>,
  /// Settings file; looked up beside the input or in the working directory
  /// when absent.
  pub config:       Option<PathBuf>,
  pub all:          bool,
  pub cc0:          bool,
  pub line_numbers: bool,
  /// Transfer the `note` column.
  pub notes:        bool,
  /// Overrides `extra-delimiter` from the settings.
  pub delimiter:    Option<String>,
}

/// What a forward run produced.
#[derive(Debug)]
pub struct ForwardSummary {
  pub output:      PathBuf,
  pub stats:       BuildStats,
  pub diagnostics: usize,
  /// Distinct input lines with at least one diagnostic.
  pub lines:       usize,
}

/// Convert a CSV letter table into a CMIF document.
pub fn csv_to_cmif(options: &ForwardOptions, now: NaiveDateTime) -> Result<ForwardSummary> {
  let input = &options.input;
  if !input.is_file() {
    return Err(Error::NotFound(input.clone()));
  }
  let output = options
    .output
    .clone()
    .unwrap_or_else(|| input.with_extension("xml"));

  let delimiter = match &options.delimiter {
    Some(d) => Some(validate_delimiter(d)?),
    None => None,
  };
  let settings = Settings::load(Settings::locate(options.config.as_deref(), input)?.as_deref())?;
  let delimiter = match delimiter {
    Some(d) => d,
    None => settings
      .delimiter()?
      .unwrap_or_else(|| DEFAULT_DELIMITER.to_string()),
  };

  let file = File::open(input).map_err(Error::io(input))?;
  let mut reader = LetterReader::new(BufReader::new(file), BuildOptions {
    delimiter,
    include_unedited: options.all,
    line_numbers: options.line_numbers,
    notes: options.notes,
    default_edition: false,
  })?;

  let mut header = document_header(&settings, input, now);
  if options.cc0 {
    header.license = License::Cc0;
  }
  if header.default_edition.is_none() && !reader.builder().columns().has(Field::Edition) {
    warn!("no edition stated, please set one manually");
    header.default_edition = Some(String::new());
  }
  reader
    .builder_mut()
    .set_default_edition(header.default_edition.is_some());
  let mut writer = DocumentWriter::new(header);
  while let Some(letter) = reader.next_letter()? {
    writer.push(&letter)?;
  }
  let builder = reader.finish();
  let xml = writer.finish(builder.bibliography())?;
  fs::write(&output, xml).map_err(Error::io(&output))?;

  let diagnostics = builder.diagnostics();
  let summary = ForwardSummary {
    output,
    stats: builder.stats(),
    diagnostics: diagnostics.len(),
    lines: diagnostics.affected_lines(),
  };
  info!(
    letters = summary.stats.letters,
    unedited = summary.stats.unedited,
    empty = summary.stats.empty,
    "conversion finished"
  );
  if summary.diagnostics > 0 {
    warn!("{} problem(s) on {} line(s)", summary.diagnostics, summary.lines);
  }
  Ok(summary)
}

/// Document header from the settings, with the run's defaults.
fn document_header(settings: &Settings, input: &Path, now: NaiveDateTime) -> DocumentHeader {
  let mut header = DocumentHeader::new(now);
  if let Some(title) = settings.title() {
    header.title = title.to_string();
  }
  header.editors = settings.editors();
  header.publishers = settings.publishers();
  header.file_url = match settings.file_url() {
    Some(url) => url.to_string(),
    None => input.with_extension("xml").display().to_string(),
  };
  header.license = settings.license();
  header.default_edition = settings.edition_title().map(str::to_string);
  header.edition_type = settings.edition_type();
  header.short_titles = settings.short_titles();
  header
}

// ─── CMIF → CSV ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct ReverseOptions {
  pub input:     PathBuf,
  /// Defaults to the input path with a `.csv` extension.
  pub output:    Option<PathBuf>,
  pub delimiter: Option<String>,
}

#[derive(Debug)]
pub struct ReverseSummary {
  pub output:  PathBuf,
  pub letters: usize,
}

/// Extract the letters of a CMIF document into a CSV table.
pub fn cmif_to_csv(options: &ReverseOptions) -> Result<ReverseSummary> {
  let input = &options.input;
  if !input.is_file() {
    return Err(Error::NotFound(input.clone()));
  }
  let output = options
    .output
    .clone()
    .unwrap_or_else(|| input.with_extension("csv"));
  let delimiter = match &options.delimiter {
    Some(d) => validate_delimiter(d)?,
    None => DEFAULT_DELIMITER.to_string(),
  };

  let xml = fs::read_to_string(input).map_err(Error::io(input))?;
  let rows = decode_document(&xml)?.rows(&delimiter);
  let file = File::create(&output).map_err(Error::io(&output))?;
  write_rows(file, &rows)?;

  info!(letters = rows.len(), "extraction finished");
  Ok(ReverseSummary {
    output,
    letters: rows.len(),
  })
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use cmif_core::flat::FlatRow;

  use super::*;

  fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1)
      .unwrap()
      .and_hms_opt(9, 0, 0)
      .unwrap()
  }

  const TABLE: &str = "\
sender,senderID,senderDate,addressee,edition,key,note
Schmidt;[Müller],118540238;,[1850-03-02],Weber,Bw,1,mit Beilage
,,,,Bw,2,
Weber,,1850/,Schmidt,,3,
";

  const INI: &str = "\
[Project]
title = Testbriefe
editor = Jane Doe <jane@example.org>

[Bw]
title = Briefwechsel, hg. von Jane Doe
";

  fn setup(dir: &Path, ini: Option<&str>) -> PathBuf {
    let input = dir.join("letters.csv");
    fs::write(&input, TABLE).unwrap();
    if let Some(ini) = ini {
      fs::write(dir.join("csv2cmi.ini"), ini).unwrap();
    }
    input
  }

  // ── Forward ────────────────────────────────────────────────────────────────

  #[test]
  fn forward_run_writes_document_beside_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = setup(dir.path(), Some(INI));
    let summary = csv_to_cmif(
      &ForwardOptions {
        input: input.clone(),
        ..ForwardOptions::default()
      },
      now(),
    )
    .unwrap();

    assert_eq!(summary.output, input.with_extension("xml"));
    assert_eq!(summary.stats.letters, 1);
    assert_eq!(summary.stats.empty, 1);
    assert_eq!(summary.stats.unedited, 1);
    assert_eq!(summary.diagnostics, 1);

    let xml = fs::read_to_string(&summary.output).unwrap();
    assert!(xml.contains("<title xml:id=\"title-"));
    assert!(xml.contains(">Testbriefe</title>"));
    assert!(xml.contains("<email>jane@example.org</email>"));
    assert!(xml.contains(">Briefwechsel, hg. von Jane Doe</bibl>"));
    assert!(xml.contains(
      "<persName ref=\"https://d-nb.info/gnd/118540238\">Schmidt</persName>"
    ));
    assert!(xml.contains("<persName cert=\"medium\" evidence=\"conjecture\">Müller</persName>"));
    assert!(xml.contains("<date when=\"1850-03-02\" cert=\"medium\" evidence=\"conjecture\"/>"));
  }

  #[test]
  fn all_flag_and_line_numbers() {
    let dir = tempfile::tempdir().unwrap();
    let input = setup(dir.path(), None);
    let output = dir.path().join("out.xml");
    let summary = csv_to_cmif(
      &ForwardOptions {
        input,
        output: Some(output.clone()),
        all: true,
        line_numbers: true,
        cc0: true,
        ..ForwardOptions::default()
      },
      now(),
    )
    .unwrap();

    assert_eq!(summary.output, output);
    assert_eq!(summary.stats.letters, 2);
    let xml = fs::read_to_string(&output).unwrap();
    assert!(xml.contains(" n=\"2\""));
    assert!(xml.contains(" n=\"4\""));
    assert!(xml.contains("publicdomain/zero"));
    assert!(xml.contains(&format!(">{}</title>", cmif_xml::document::UNTITLED)));
  }

  #[test]
  fn notes_only_on_request() {
    let dir = tempfile::tempdir().unwrap();
    let input = setup(dir.path(), None);
    let plain = csv_to_cmif(
      &ForwardOptions {
        input: input.clone(),
        output: Some(dir.path().join("plain.xml")),
        ..ForwardOptions::default()
      },
      now(),
    )
    .unwrap();
    assert!(!fs::read_to_string(&plain.output).unwrap().contains("<note>"));

    let noted = csv_to_cmif(
      &ForwardOptions {
        input,
        output: Some(dir.path().join("noted.xml")),
        notes: true,
        ..ForwardOptions::default()
      },
      now(),
    )
    .unwrap();
    assert!(fs::read_to_string(&noted.output).unwrap().contains("<note>mit Beilage</note>"));
  }

  #[test]
  fn bad_delimiter_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let input = setup(dir.path(), None);
    let result = csv_to_cmif(
      &ForwardOptions {
        input,
        delimiter: Some(";;".into()),
        ..ForwardOptions::default()
      },
      now(),
    );
    assert!(matches!(result, Err(Error::Delimiter(_))));
  }

  #[test]
  fn missing_column_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("letters.csv");
    fs::write(&input, "sender,date\nA,1850\n").unwrap();
    let result = csv_to_cmif(
      &ForwardOptions {
        input,
        ..ForwardOptions::default()
      },
      now(),
    );
    assert!(matches!(
      result,
      Err(Error::Table(cmif_table::Error::MissingColumn("addressee")))
    ));
  }

  #[test]
  fn missing_input_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let result = csv_to_cmif(
      &ForwardOptions {
        input: dir.path().join("nope.csv"),
        ..ForwardOptions::default()
      },
      now(),
    );
    assert!(matches!(result, Err(Error::NotFound(_))));
  }

  // ── Reverse ────────────────────────────────────────────────────────────────

  #[test]
  fn forward_then_reverse() {
    let dir = tempfile::tempdir().unwrap();
    let input = setup(dir.path(), None);
    let forward = csv_to_cmif(
      &ForwardOptions {
        input,
        ..ForwardOptions::default()
      },
      now(),
    )
    .unwrap();

    let reverse = cmif_to_csv(&ReverseOptions {
      input: forward.output.clone(),
      output: Some(dir.path().join("back.csv")),
      delimiter: None,
    })
    .unwrap();
    assert_eq!(reverse.letters, 1);

    let mut csv = csv::Reader::from_path(&reverse.output).unwrap();
    let header: Vec<_> = csv.headers().unwrap().iter().map(str::to_string).collect();
    assert_eq!(header, FlatRow::HEADER);
    let rows: Vec<FlatRow> = csv.deserialize().map(Result::unwrap).collect();
    assert_eq!(rows[0].sender, "Schmidt;Müller?");
    assert_eq!(rows[0].sender_id, "https://d-nb.info/gnd/118540238;");
    assert_eq!(rows[0].sender_date, "1850-03-02?");
    assert_eq!(rows[0].edition, "Bw");
    assert_eq!(rows[0].key, "1");
  }
}
