//! Tabular side of the letter-catalogue conversion.
//!
//! Reads CSV rows into [`cmif_core::letter::Letter`]s through the
//! [`RecordBuilder`], and writes extracted [`cmif_core::flat::FlatRow`]s back
//! out as CSV.

pub mod builder;
pub mod columns;
pub mod diagnostics;
pub mod error;
mod reader;
mod writer;

pub use builder::{BuildOptions, BuildStats, DropReason, RecordBuilder, RowOutcome};
pub use columns::{Cells, ColumnMap, Field};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{Error, Result};
pub use reader::LetterReader;
pub use writer::write_rows;
