//! `cmi2csv`: extract the letters of a CMIF document into a CSV table.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use cmif_cli::{ReverseOptions, convert::cmif_to_csv, init_tracing};

#[derive(Parser, Debug)]
#[command(name = "cmi2csv", version, about = "Convert CMI files to tables of letters")]
struct Args {
  /// Input file (.xml).
  filename: PathBuf,

  /// Output file name.
  #[arg(short, long, value_name = "FILE")]
  output: Option<PathBuf>,

  /// Delimiter for different values within cells.
  #[arg(long, value_name = "DELIM")]
  extra_delimiter: Option<String>,

  /// Increase output verbosity.
  #[arg(short, long)]
  verbose: bool,
}

fn main() -> anyhow::Result<()> {
  let args = Args::parse();
  init_tracing(args.verbose);

  let options = ReverseOptions {
    input:     args.filename,
    output:    args.output,
    delimiter: args.extra_delimiter,
  };
  let summary = cmif_to_csv(&options)
    .with_context(|| format!("extracting {}", options.input.display()))?;

  println!("{} letter(s) written to {}", summary.letters, summary.output.display());
  Ok(())
}
