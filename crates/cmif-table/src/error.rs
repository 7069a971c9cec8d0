//! Error types for `cmif-table`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("no {0:?} column in table")]
  MissingColumn(&'static str),

  #[error("CSV error: {0}")]
  Csv(#[from] csv::Error),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
