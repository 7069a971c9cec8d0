//! Error types for `cmif-xml`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("xml error: {0}")]
  Xml(String),

  #[error("no <{0}> element in input")]
  MissingElement(&'static str),

  #[error("invalid date on <{element}>: {source}")]
  InvalidDate {
    element: &'static str,
    #[source]
    source:  cmif_core::Error,
  },
}

impl Error {
  pub(crate) fn xml(e: impl std::fmt::Display) -> Self { Error::Xml(e.to_string()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
