//! Builds `REXE` images: a fixed 512-byte directory followed by up to fifteen
//! sector-aligned payloads, which a kernel loader can look up by name without
//! a filesystem.
//!
//! ```no_run
//! let plan = rexe::planner::plan(["build/init.elf", "progs/shell.bas"])?;
//! rexe::writer::ImageWriter::default().write_to_path("build/exec_table.bin", &plan)?;
//! # Ok::<(), rexe::error::Error>(())
//! ```

use std::path::Path;

pub mod align;
pub mod error;
pub mod naming;
pub mod planner;
pub mod reader;
pub mod serialize;
pub mod spec;
pub mod writer;

/// Plans `inputs` with the default naming rules and writes the image to
/// `output`.
pub fn build<I, P>(output: impl AsRef<Path>, inputs: I) -> error::Result<planner::Plan>
where
  I: IntoIterator<Item = P>,
  P: AsRef<Path>,
{
  let plan = planner::plan(inputs)?;
  writer::ImageWriter::default().write_to_path(output, &plan)?;
  Ok(plan)
}
