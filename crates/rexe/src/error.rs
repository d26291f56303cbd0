use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
  #[error("No input files given")]
  NoInputs,
  #[error("Too many entries ({count} > {max})")]
  InputCountExceeded { count: usize, max: usize },
  #[error("File not found: {0}")]
  InputNotFound(PathBuf),
  #[error("Empty payload: {0}")]
  EmptyInput(PathBuf),
  #[error("Cannot derive an entry name from: {0}")]
  InvalidName(PathBuf),
  #[error("Duplicate entry name {name:?}: {first} and {second}")]
  DuplicateName {
    name: String,
    first: PathBuf,
    second: PathBuf,
  },
  #[error("Image too large: {size} bytes does not fit 32-bit offsets")]
  ImageTooLarge { size: u64 },
  #[error("{path} changed while writing (planned {expected} bytes, found {actual})")]
  SourceChanged {
    path: PathBuf,
    expected: u64,
    actual: u64,
  },
  #[error("Buffer too small (needed {needed}, got {actual})")]
  BufferTooSmall { needed: usize, actual: usize },
  #[error("Invalid magic")]
  InvalidMagic,
  #[error("Unsupported version {0}")]
  UnsupportedVersion(u32),
  #[error("Entry count {0} out of range")]
  CountOutOfRange(u32),
  #[error("Entry {index} lies outside the image")]
  EntryOutOfBounds { index: usize },
  #[error("Entry {index} is empty")]
  EmptyEntry { index: usize },
  #[error("No entry named {0:?}")]
  EntryNotFound(String),
  #[error("Entry {index} does not match the planned layout")]
  VerifyMismatch { index: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
