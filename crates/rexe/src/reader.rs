//! Read-side view of a finished image, as the kernel loader sees it.

use crate::{
  error::{Error, Result},
  serialize::RexeDeserialize,
  spec::{self, DirectoryEntry, ImageDirectory},
};

/// A decoded directory borrowing the image bytes it describes.
#[derive(Debug)]
pub struct Image<'a> {
  bytes: &'a [u8],
  directory: ImageDirectory,
}

impl<'a> Image<'a> {
  /// Decodes the directory at the start of `bytes` and checks that every
  /// payload lies inside the buffer.
  pub fn parse(bytes: &'a [u8]) -> Result<Self> {
    let directory = ImageDirectory::deserialize(bytes)?;

    for (index, entry) in directory.entries().iter().enumerate() {
      let end = entry.offset as u64 + entry.size as u64;
      if end > bytes.len() as u64 {
        return Err(Error::EntryOutOfBounds { index });
      }
    }

    Ok(Self { bytes, directory })
  }

  pub fn directory(&self) -> &ImageDirectory {
    &self.directory
  }

  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }

  pub fn payload_at(&self, index: usize) -> Option<&'a [u8]> {
    self.directory.entries().get(index).map(|e| self.slice(e))
  }

  pub fn payload(&self, name: &str) -> Result<&'a [u8]> {
    self
      .directory
      .find(name)
      .map(|e| self.slice(e))
      .ok_or_else(|| Error::EntryNotFound(name.to_owned()))
  }

  /// Entry names paired with their payload bytes, in directory order.
  pub fn payloads(&self) -> impl Iterator<Item = (&DirectoryEntry, &'a [u8])> + '_ {
    self
      .directory
      .entries()
      .iter()
      .map(move |e| (e, self.slice(e)))
  }

  fn slice(&self, entry: &DirectoryEntry) -> &'a [u8] {
    let bytes: &'a [u8] = self.bytes;
    let start = entry.offset as usize;
    &bytes[start..start + entry.size as usize]
  }
}

/// Finds a valid table embedded in `haystack`, e.g. appended to a kernel
/// binary whose size is not a multiple of the sector size. The scan advances
/// in 4-byte steps and returns the offset of the first directory that
/// decodes.
pub fn locate(haystack: &[u8]) -> Option<usize> {
  let dir_size = spec::DIRECTORY_SIZE as usize;

  (0..haystack.len().saturating_sub(dir_size - 1))
    .step_by(4)
    .filter(|&ix| haystack[ix..ix + 4] == spec::MAGIC)
    .find(|&ix| Image::parse(&haystack[ix..]).is_ok())
}
