mod cli;

use std::process::ExitCode;

use rexe::{
  error::Error,
  planner::{Plan, Planner, PlannerOptions},
  reader::Image,
  writer::{ImageWriter, WriterOptions},
};

fn main() -> ExitCode {
  pretty_env_logger::init();

  let cli = cli::parse();

  match run(&cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      eprintln!("Error: {err}");
      if matches!(err, Error::NoInputs) {
        eprintln!("Usage: make_exec_table <output> <file1> [file2] ...");
      }
      ExitCode::FAILURE
    }
  }
}

fn run(cli: &cli::Cli) -> Result<(), Error> {
  let options = if cli.keep_ext.is_empty() {
    PlannerOptions::default()
  } else {
    PlannerOptions {
      preserved_extensions: cli.keep_ext.clone(),
    }
  };

  let plan = Planner::new(options).plan(&cli.inputs)?;

  for descriptor in plan.descriptors() {
    println!("  {}: {} bytes", descriptor.display_name(), descriptor.size());
  }

  if cli.dry_run {
    println!(
      "Would create {}: {} bytes ({} entries)",
      cli.output.display(),
      plan.image_size(),
      plan.len()
    );
    return Ok(());
  }

  let written = ImageWriter::new(WriterOptions::default()).write_to_path(&cli.output, &plan)?;

  if cli.verify {
    verify(&cli.output, &plan)?;
    log::info!("Verified {}", cli.output.display());
  }

  println!(
    "Created {}: {} bytes ({} entries)",
    cli.output.display(),
    written,
    plan.len()
  );

  Ok(())
}

fn verify(path: &std::path::Path, plan: &Plan) -> Result<(), Error> {
  let bytes = std::fs::read(path)?;
  let image = Image::parse(&bytes)?;
  plan.verify(&image)?;

  for (index, (descriptor, (_, payload))) in plan
    .descriptors()
    .iter()
    .zip(image.payloads())
    .enumerate()
  {
    if std::fs::read(descriptor.source())? != payload {
      return Err(Error::VerifyMismatch { index });
    }
  }

  Ok(())
}
