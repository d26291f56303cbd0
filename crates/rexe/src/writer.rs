//! Serializes a [`Plan`] into an image.

use std::{
  fs::File,
  io::{BufReader, BufWriter, Read, Write},
  path::{Path, PathBuf},
};

use crate::{
  align::align_up,
  error::{Error, Result},
  planner::{PayloadDescriptor, Plan},
  spec,
};

const ZERO_SECTOR: [u8; spec::SECTOR_SIZE as usize] = [0; spec::SECTOR_SIZE as usize];

/// Tracks the output position so payloads can be padded to sector boundaries.
struct SectorWriter<Storage> {
  storage: Storage,
  position: u64,
  sector_size: u64,
}

impl<Storage> SectorWriter<Storage>
where
  Storage: Write,
{
  fn new(storage: Storage, sector_size: u32) -> Self {
    Self {
      storage,
      position: 0,
      sector_size: sector_size as u64,
    }
  }

  /// Write zeros up to the next sector boundary.
  fn pad_to_sector(&mut self) -> std::io::Result<u64> {
    let padding = align_up(self.position, self.sector_size) - self.position;
    let mut remaining = padding as usize;

    while remaining > 0 {
      let chunk = remaining.min(ZERO_SECTOR.len());
      self.write_all(&ZERO_SECTOR[..chunk])?;
      remaining -= chunk;
    }

    Ok(padding)
  }
}

impl<Storage> Write for SectorWriter<Storage>
where
  Storage: Write,
{
  fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
    let written = self.storage.write(buf)?;
    self.position += written as u64;
    Ok(written)
  }

  fn flush(&mut self) -> std::io::Result<()> {
    self.storage.flush()
  }
}

pub struct WriterOptions {
  /// Stage the image next to the output and rename it into place once
  /// complete, so a failed run leaves the previous output untouched.
  pub atomic: bool,
}

impl Default for WriterOptions {
  fn default() -> Self {
    Self { atomic: true }
  }
}

#[derive(Default)]
pub struct ImageWriter {
  options: WriterOptions,
}

impl ImageWriter {
  pub fn new(options: WriterOptions) -> Self {
    Self { options }
  }

  /// Writes the directory followed by every padded payload and returns the
  /// number of bytes written.
  pub fn write<W>(&self, writer: W, plan: &Plan) -> Result<u64>
  where
    W: Write,
  {
    let mut writer = SectorWriter::new(writer, spec::SECTOR_SIZE);

    let directory = plan.directory()?;
    log::debug!("Writing directory: {:?}", directory);
    writer.write_all(&directory.to_bytes()?)?;

    for descriptor in plan.descriptors() {
      write_payload(&mut writer, descriptor)?;
    }

    writer.flush()?;

    debug_assert_eq!(writer.position, plan.image_size());

    Ok(writer.position)
  }

  /// Writes the image to `path`, replacing any existing file.
  pub fn write_to_path(&self, path: impl AsRef<Path>, plan: &Plan) -> Result<u64> {
    let path = path.as_ref();

    if !self.options.atomic {
      return self.write_file(File::create(path)?, plan);
    }

    let staging = staging_path(path);
    let result = File::create(&staging)
      .map_err(Error::from)
      .and_then(|file| self.write_file(file, plan))
      .and_then(|written| {
        std::fs::rename(&staging, path)?;
        Ok(written)
      });

    if result.is_err() {
      let _ = std::fs::remove_file(&staging);
    }

    result
  }

  fn write_file(&self, file: File, plan: &Plan) -> Result<u64> {
    let mut writer = BufWriter::new(file);
    let written = self.write(&mut writer, plan)?;

    writer
      .into_inner()
      .map_err(|e| e.into_error())?
      .sync_all()?;

    Ok(written)
  }
}

/// Streams one payload's bytes, then pads to the next sector.
fn write_payload<W>(writer: &mut SectorWriter<W>, descriptor: &PayloadDescriptor) -> Result<()>
where
  W: Write,
{
  log::info!(
    "Writing payload (offset {}): {}",
    descriptor.offset(),
    descriptor.display_name()
  );

  debug_assert_eq!(writer.position, descriptor.offset() as u64);

  let expected = descriptor.size() as u64;
  let file = File::open(descriptor.source())?;
  let mut reader = BufReader::new(file).take(expected);

  let copied = std::io::copy(&mut reader, &mut *writer)?;
  let actual = reader.get_ref().get_ref().metadata()?.len();

  if copied != expected || actual != expected {
    return Err(Error::SourceChanged {
      path: descriptor.source().to_path_buf(),
      expected,
      actual,
    });
  }

  let padding = writer.pad_to_sector()?;
  log::debug!("Padded {} with {} zero bytes", descriptor.display_name(), padding);

  Ok(())
}

/// Hidden sibling of `path` used while the image is being written.
fn staging_path(path: &Path) -> PathBuf {
  let mut name = std::ffi::OsString::from(".");
  name.push(path.file_name().unwrap_or_else(|| "image".as_ref()));
  name.push(".tmp");
  path.with_file_name(name)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::planner::plan;
  use std::fs;

  #[test]
  fn pads_each_payload_to_a_sector() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.bin");
    let shell = dir.path().join("shell.bas");
    fs::write(&a, vec![0x11; 700]).unwrap();
    fs::write(&shell, b"10 PRINT 1").unwrap();

    let plan = plan([&a, &shell]).unwrap();
    let mut image = Vec::<u8>::new();
    let written = ImageWriter::default().write(&mut image, &plan).unwrap();

    assert_eq!(written, 2048);
    assert_eq!(image.len(), 2048);
    assert_eq!(&image[0..4], b"REXE");
    assert!(image[512..1212].iter().all(|&b| b == 0x11));
    assert!(image[1212..1536].iter().all(|&b| b == 0));
    assert_eq!(&image[1536..1546], b"10 PRINT 1");
    assert!(image[1546..].iter().all(|&b| b == 0));
  }

  #[test]
  fn output_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("prog");
    fs::write(&input, b"payload").unwrap();

    let plan = plan([&input]).unwrap();
    let (mut first, mut second) = (Vec::<u8>::new(), Vec::<u8>::new());
    ImageWriter::default().write(&mut first, &plan).unwrap();
    ImageWriter::default().write(&mut second, &plan).unwrap();

    assert_eq!(first, second);
  }

  #[test]
  fn detects_source_changed_after_planning() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("prog");
    fs::write(&input, b"short").unwrap();

    let plan = plan([&input]).unwrap();
    fs::write(&input, b"much longer now").unwrap();

    assert!(matches!(
      ImageWriter::default().write(&mut Vec::<u8>::new(), &plan),
      Err(Error::SourceChanged {
        expected: 5,
        actual: 15,
        ..
      })
    ));
  }

  #[test]
  fn atomic_write_replaces_output_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("prog");
    let output = dir.path().join("table.bin");
    fs::write(&input, b"abc").unwrap();
    fs::write(&output, b"old contents").unwrap();

    let plan = plan([&input]).unwrap();
    let written = ImageWriter::default().write_to_path(&output, &plan).unwrap();

    assert_eq!(written, 1024);
    assert_eq!(fs::metadata(&output).unwrap().len(), 1024);
    assert!(!staging_path(&output).exists());
  }

  #[test]
  fn failed_write_keeps_previous_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("prog");
    let output = dir.path().join("table.bin");
    fs::write(&input, b"abc").unwrap();
    fs::write(&output, b"old contents").unwrap();

    let plan = plan([&input]).unwrap();
    fs::remove_file(&input).unwrap();

    assert!(ImageWriter::default().write_to_path(&output, &plan).is_err());
    assert_eq!(fs::read(&output).unwrap(), b"old contents");
    assert!(!staging_path(&output).exists());
  }

  #[test]
  fn staging_path_is_a_hidden_sibling() {
    assert_eq!(
      staging_path(Path::new("out/table.bin")),
      Path::new("out/.table.bin.tmp")
    );
  }
}
