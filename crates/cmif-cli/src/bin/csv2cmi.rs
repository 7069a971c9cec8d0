//! `csv2cmi`: convert a CSV table of letters into a CMIF document.
//!
//! ```text
//! csv2cmi letters.csv
//! csv2cmi --all --line-numbers -o cmif.xml letters.csv
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use cmif_cli::{ForwardOptions, convert::csv_to_cmif, init_tracing};

#[derive(Parser, Debug)]
#[command(name = "csv2cmi", version, about = "Convert tables of letters to CMI")]
struct Args {
  /// Input file (.csv).
  filename: PathBuf,

  /// Include unedited letters.
  #[arg(short, long)]
  all: bool,

  /// Output file name.
  #[arg(short, long, value_name = "FILE")]
  output: Option<PathBuf>,

  /// Increase output verbosity.
  #[arg(short, long)]
  verbose: bool,

  /// Mark as public domain.
  #[arg(long)]
  cc0: bool,

  /// Add line numbers.
  #[arg(long)]
  line_numbers: bool,

  /// Transfer notes.
  #[arg(short, long)]
  notes: bool,

  /// Delimiter for different values within cells.
  #[arg(long, value_name = "DELIM")]
  extra_delimiter: Option<String>,

  /// Settings file (default: csv2cmi.ini beside the input or in the
  /// working directory).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
  let args = Args::parse();
  init_tracing(args.verbose);

  let options = ForwardOptions {
    input:        args.filename,
    output:       args.output,
    config:       args.config,
    all:          args.all,
    cc0:          args.cc0,
    line_numbers: args.line_numbers,
    notes:        args.notes,
    delimiter:    args.extra_delimiter,
  };
  let now = chrono::Local::now().naive_local();
  let summary = csv_to_cmif(&options, now)
    .with_context(|| format!("converting {}", options.input.display()))?;

  println!("CMI file written to {}", summary.output.display());
  Ok(())
}
