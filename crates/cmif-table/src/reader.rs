use std::io::Read;

use cmif_core::letter::Letter;
use csv::StringRecord;

use crate::{
  builder::{BuildOptions, RecordBuilder, RowOutcome},
  columns::ColumnMap,
  error::Result,
};

/// Streams letters out of a CSV table, one row at a time.
///
/// The header is validated on construction. Rows that build no letter are
/// skipped; why is recorded in the builder's diagnostics and stats.
pub struct LetterReader<R> {
  csv:     csv::Reader<R>,
  builder: RecordBuilder,
  record:  StringRecord,
}

impl<R: Read> LetterReader<R> {
  pub fn new(input: R, options: BuildOptions) -> Result<Self> {
    let mut csv = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    let columns = ColumnMap::from_headers(csv.headers()?.iter())?;
    Ok(Self {
      csv,
      builder: RecordBuilder::new(columns, options),
      record: StringRecord::new(),
    })
  }

  pub fn builder(&self) -> &RecordBuilder { &self.builder }

  pub fn builder_mut(&mut self) -> &mut RecordBuilder { &mut self.builder }

  /// The next letter, or `None` at end of input.
  pub fn next_letter(&mut self) -> Result<Option<Letter>> {
    while self.csv.read_record(&mut self.record)? {
      let line = self.record.position().map_or(0, |p| p.line());
      if let RowOutcome::Letter(letter) = self.builder.build_record(&self.record, line) {
        return Ok(Some(letter));
      }
    }
    Ok(None)
  }

  /// Give up the reader, keeping the run's bibliography and diagnostics.
  pub fn finish(self) -> RecordBuilder { self.builder }
}

impl<R: Read> Iterator for LetterReader<R> {
  type Item = Result<Letter>;

  fn next(&mut self) -> Option<Self::Item> { self.next_letter().transpose() }
}
