//! Command-line conversion between letter tables and CMIF documents.
//!
//! The `csv2cmi` and `cmi2csv` binaries are thin wrappers around
//! [`convert::csv_to_cmif`] and [`convert::cmif_to_csv`].

pub mod convert;
pub mod error;
pub mod settings;

pub use convert::{ForwardOptions, ForwardSummary, ReverseOptions, ReverseSummary};
pub use error::{Error, Result};
pub use settings::Settings;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Install the log subscriber: warnings by default, `INFO` when verbose.
/// `RUST_LOG` overrides both.
pub fn init_tracing(verbose: bool) {
  let level = if verbose { LevelFilter::INFO } else { LevelFilter::WARN };
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();
}
