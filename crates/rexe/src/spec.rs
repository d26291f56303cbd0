//! On-disk layout of the `REXE` payload table.
//!
//! An image starts with a 512-byte directory:
//!
//! | Field    | Offset | Size | Encoding             |
//! |----------|--------|------|----------------------|
//! | magic    | 0      | 4    | ASCII `REXE`         |
//! | version  | 4      | 4    | little-endian u32, 1 |
//! | count    | 8      | 4    | little-endian u32    |
//! | reserved | 12     | 4    | zero                 |
//! | entries  | 16     | 480  | 15 x [`DirectoryEntry`] |
//!
//! Bytes 496..512 are zero. Payloads follow at byte 512, each padded with
//! zeros to the next sector boundary.

use std::borrow::Cow;

use byteorder::{ByteOrder, LittleEndian};

use crate::{
  error::{Error, Result},
  serialize::{ensure_len, RexeDeserialize, RexeSerialize},
};

pub const MAGIC: [u8; 4] = *b"REXE";
pub const VERSION: u32 = 1;
/// Number of record slots in the directory.
pub const MAX_ENTRIES: usize = 15;
pub const DIRECTORY_SIZE: u32 = 512;
pub const SECTOR_SIZE: u32 = 512;
pub const HEADER_SIZE: usize = 16;
pub const ENTRY_SIZE: usize = 32;
pub const NAME_SIZE: usize = 16;
/// Longest storable name; the last byte of the buffer is always a terminator.
pub const NAME_MAX: usize = NAME_SIZE - 1;

const _: () = assert!(HEADER_SIZE + MAX_ENTRIES * ENTRY_SIZE <= DIRECTORY_SIZE as usize);
const _: () = assert!(SECTOR_SIZE.is_power_of_two());

/// Null-terminated entry name buffer.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EntryName(pub(crate) [u8; NAME_SIZE]);

impl EntryName {
  /// Encodes `name` as UTF-8, keeping at most [`NAME_MAX`] bytes.
  pub fn from_str_truncated(name: &str) -> Self {
    let mut data = [0; NAME_SIZE];
    let bytes = name.as_bytes();
    let len = bytes.len().min(NAME_MAX);
    data[..len].copy_from_slice(&bytes[..len]);
    Self(data)
  }

  /// Name bytes up to the first zero, never past index 15.
  pub fn as_bytes(&self) -> &[u8] {
    let len = self.0[..NAME_MAX]
      .iter()
      .position(|&b| b == 0)
      .unwrap_or(NAME_MAX);
    &self.0[..len]
  }

  pub fn to_string_lossy(&self) -> Cow<'_, str> {
    String::from_utf8_lossy(self.as_bytes())
  }

  pub fn is_empty(&self) -> bool {
    self.0[0] == 0
  }

  pub fn raw(&self) -> &[u8; NAME_SIZE] {
    &self.0
  }
}

impl std::fmt::Debug for EntryName {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{:?}", self.to_string_lossy())
  }
}

/// One 32-byte directory record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
  pub name: EntryName,
  /// Absolute byte offset of the payload within the image.
  pub offset: u32,
  /// Unpadded payload length.
  pub size: u32,
  pub reserved: [u32; 2],
}

impl DirectoryEntry {
  pub const ZERO: Self = Self {
    name: EntryName([0; NAME_SIZE]),
    offset: 0,
    size: 0,
    reserved: [0; 2],
  };

  pub fn new(name: EntryName, offset: u32, size: u32) -> Self {
    Self {
      name,
      offset,
      size,
      reserved: [0; 2],
    }
  }
}

impl RexeSerialize for DirectoryEntry {
  fn extent(&self) -> usize {
    ENTRY_SIZE
  }

  fn serialize(&self, out: &mut [u8]) -> Result<()> {
    ensure_len(out.len(), ENTRY_SIZE)?;

    out[..NAME_SIZE].copy_from_slice(&self.name.0);
    LittleEndian::write_u32(&mut out[16..20], self.offset);
    LittleEndian::write_u32(&mut out[20..24], self.size);
    LittleEndian::write_u32(&mut out[24..28], self.reserved[0]);
    LittleEndian::write_u32(&mut out[28..32], self.reserved[1]);

    Ok(())
  }
}

impl RexeDeserialize for DirectoryEntry {
  fn deserialize(bytes: &[u8]) -> Result<Self> {
    ensure_len(bytes.len(), ENTRY_SIZE)?;

    let mut name = [0; NAME_SIZE];
    name.copy_from_slice(&bytes[..NAME_SIZE]);

    Ok(Self {
      name: EntryName(name),
      offset: LittleEndian::read_u32(&bytes[16..20]),
      size: LittleEndian::read_u32(&bytes[20..24]),
      reserved: [
        LittleEndian::read_u32(&bytes[24..28]),
        LittleEndian::read_u32(&bytes[28..32]),
      ],
    })
  }
}

/// The 512-byte table at the start of an image.
///
/// Slots past `count` are always [`DirectoryEntry::ZERO`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDirectory {
  version: u32,
  count: u32,
  entries: [DirectoryEntry; MAX_ENTRIES],
}

impl ImageDirectory {
  pub fn from_entries<I>(entries: I) -> Result<Self>
  where
    I: IntoIterator<Item = DirectoryEntry>,
  {
    let mut slots = [DirectoryEntry::ZERO; MAX_ENTRIES];
    let mut count = 0;

    for entry in entries {
      if count == MAX_ENTRIES {
        return Err(Error::InputCountExceeded {
          count: count + 1,
          max: MAX_ENTRIES,
        });
      }
      slots[count] = entry;
      count += 1;
    }

    Ok(Self {
      version: VERSION,
      count: count as u32,
      entries: slots,
    })
  }

  pub fn version(&self) -> u32 {
    self.version
  }

  pub fn count(&self) -> usize {
    self.count as usize
  }

  /// Populated entries only.
  pub fn entries(&self) -> &[DirectoryEntry] {
    &self.entries[..self.count()]
  }

  /// All fifteen slots, including the zeroed ones.
  pub fn slots(&self) -> &[DirectoryEntry; MAX_ENTRIES] {
    &self.entries
  }

  pub fn names(&self) -> impl Iterator<Item = Cow<'_, str>> {
    self.entries().iter().map(|e| e.name.to_string_lossy())
  }

  pub fn find(&self, name: &str) -> Option<&DirectoryEntry> {
    self
      .entries()
      .iter()
      .find(|e| e.name.as_bytes() == name.as_bytes())
  }

  pub fn to_bytes(&self) -> Result<[u8; DIRECTORY_SIZE as usize]> {
    let mut bytes = [0; DIRECTORY_SIZE as usize];
    self.serialize(&mut bytes)?;
    Ok(bytes)
  }
}

impl RexeSerialize for ImageDirectory {
  fn extent(&self) -> usize {
    DIRECTORY_SIZE as usize
  }

  fn serialize(&self, out: &mut [u8]) -> Result<()> {
    ensure_len(out.len(), self.extent())?;

    out[..self.extent()].fill(0);
    out[0..4].copy_from_slice(&MAGIC);
    LittleEndian::write_u32(&mut out[4..8], self.version);
    LittleEndian::write_u32(&mut out[8..12], self.count);
    LittleEndian::write_u32(&mut out[12..16], 0);

    for (ix, entry) in self.entries.iter().enumerate() {
      let start = HEADER_SIZE + ix * ENTRY_SIZE;
      entry.serialize(&mut out[start..start + ENTRY_SIZE])?;
    }

    Ok(())
  }
}

impl RexeDeserialize for ImageDirectory {
  fn deserialize(bytes: &[u8]) -> Result<Self> {
    ensure_len(bytes.len(), DIRECTORY_SIZE as usize)?;

    if bytes[0..4] != MAGIC {
      return Err(Error::InvalidMagic);
    }

    let version = LittleEndian::read_u32(&bytes[4..8]);
    if version != VERSION {
      return Err(Error::UnsupportedVersion(version));
    }

    let count = LittleEndian::read_u32(&bytes[8..12]);
    if count as usize > MAX_ENTRIES {
      return Err(Error::CountOutOfRange(count));
    }

    let mut entries = [DirectoryEntry::ZERO; MAX_ENTRIES];
    for (ix, slot) in entries.iter_mut().take(count as usize).enumerate() {
      let start = HEADER_SIZE + ix * ENTRY_SIZE;
      let entry = DirectoryEntry::deserialize(&bytes[start..start + ENTRY_SIZE])?;

      if entry.offset < DIRECTORY_SIZE {
        return Err(Error::EntryOutOfBounds { index: ix });
      }

      if entry.size == 0 {
        return Err(Error::EmptyEntry { index: ix });
      }

      *slot = entry;
    }

    Ok(Self {
      version,
      count,
      entries,
    })
  }
}
