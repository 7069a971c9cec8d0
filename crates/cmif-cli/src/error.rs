//! Error types for the conversion runs.

use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("file not found: {0}")]
  NotFound(PathBuf),

  #[error("delimiter has to be a single character, got {0:?}")]
  Delimiter(String),

  #[error("configuration error: {0}")]
  Config(#[from] config::ConfigError),

  #[error("{}: {source}", path.display())]
  Io {
    path:   PathBuf,
    #[source]
    source: io::Error,
  },

  #[error(transparent)]
  Table(#[from] cmif_table::Error),

  #[error(transparent)]
  Xml(#[from] cmif_xml::Error),
}

impl Error {
  pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
    let path = path.into();
    move |source| Error::Io { path, source }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
