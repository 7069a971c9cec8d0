//! Core types for converting letter catalogues to and from CMIF.
//!
//! This crate is free of CSV and XML dependencies. It holds the letter
//! model, the extended date interpreter, the multi-value cell splitter and
//! the bibliography-key table shared by the table and XML crates.

pub mod authority;
pub mod bibliography;
pub mod date;
pub mod error;
pub mod flat;
pub mod letter;
pub mod split;

pub use error::{Error, Result};

/// Delimiter for several values within one cell when none is configured.
pub const DEFAULT_DELIMITER: &str = ";";
