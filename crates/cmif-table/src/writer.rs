use std::io::Write;

use cmif_core::flat::FlatRow;

use crate::error::Result;

/// Write `rows` as CSV under the fixed thirteen-column header.
///
/// The header is written even when there are no rows.
pub fn write_rows<W: Write>(output: W, rows: &[FlatRow]) -> Result<()> {
  let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(output);
  writer.write_record(FlatRow::HEADER)?;
  for row in rows {
    writer.serialize(row)?;
  }
  writer.flush()?;
  Ok(())
}
