use clap::*;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
  name = "make_exec_table",
  version,
  about = "Pack payload files into a REXE table image",
  long_about = None
)]
pub struct Cli {
  /// Image file to create.
  pub output: PathBuf,
  /// Payload files (at most 15), packed in the order given.
  pub inputs: Vec<PathBuf>,
  /// Extension kept in entry names; repeat to keep several. Defaults to `bas`.
  #[arg(long = "keep-ext", value_name = "EXT")]
  pub keep_ext: Vec<String>,
  /// Print the layout without writing the image.
  #[arg(long)]
  pub dry_run: bool,
  /// Read the written image back and check it against the layout.
  #[arg(long, conflicts_with = "dry_run")]
  pub verify: bool,
}

/// Parses the command line. Usage errors exit with status 1.
pub fn parse() -> Cli {
  Cli::try_parse().unwrap_or_else(|err| {
    let _ = err.print();
    std::process::exit(if err.use_stderr() { 1 } else { 0 })
  })
}
