//! Error types for `cmif-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid date: {0:?}")]
  InvalidDate(String),

  #[error("interval starts after it ends: {from}/{to}")]
  InvertedInterval { from: String, to: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
