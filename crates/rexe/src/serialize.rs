use crate::error::{Error, Result};

/// Fixed-size little-endian record encoding.
pub trait RexeSerialize {
  /// Encoded size in bytes.
  fn extent(&self) -> usize;

  fn serialize(&self, out: &mut [u8]) -> Result<()>;
}

pub trait RexeDeserialize: Sized {
  fn deserialize(bytes: &[u8]) -> Result<Self>;
}

pub(crate) fn ensure_len(actual: usize, needed: usize) -> Result<()> {
  if actual < needed {
    return Err(Error::BufferTooSmall { needed, actual });
  }

  Ok(())
}
