/// Rounds `value` up to a multiple of `alignment`, which must be a power of two.
///
/// `value` must not exceed `u64::MAX - alignment + 1`; see [`checked_align_up`].
pub const fn align_up(value: u64, alignment: u64) -> u64 {
  debug_assert!(alignment.is_power_of_two());
  (value + alignment - 1) & !(alignment - 1)
}

/// Like [`align_up`], but `None` when the result does not fit in a `u64`.
pub const fn checked_align_up(value: u64, alignment: u64) -> Option<u64> {
  debug_assert!(alignment.is_power_of_two());
  match value.checked_add(alignment - 1) {
    Some(v) => Some(v & !(alignment - 1)),
    None => None,
  }
}

/// Hands out sector-aligned byte offsets, one payload after another.
pub struct OffsetAllocator {
  alignment: u64,
  next_offset: u64,
}

impl OffsetAllocator {
  pub fn new(alignment: u32, base: u64) -> Self {
    Self {
      alignment: alignment as u64,
      next_offset: base,
    }
  }

  /// Returns `None`, leaving the allocator unchanged, if the end would
  /// overflow a `u64`.
  pub fn allocate(&mut self, size: u64) -> Option<u64> {
    let offset = self.next_offset;
    self.next_offset = checked_align_up(size, self.alignment)?.checked_add(offset)?;
    Some(offset)
  }

  /// First byte past everything allocated so far.
  pub fn end(&self) -> u64 {
    self.next_offset
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn align_up_sector() {
    assert_eq!(align_up(0, 512), 0);
    assert_eq!(align_up(1, 512), 512);
    assert_eq!(align_up(511, 512), 512);
    assert_eq!(align_up(512, 512), 512);
    assert_eq!(align_up(700, 512), 1024);

    for v in (0..4096).step_by(7) {
      let aligned = align_up(v, 512);
      assert!(aligned >= v);
      assert_eq!(aligned % 512, 0);
      assert!(aligned - v < 512);
    }
  }

  #[test]
  fn allocator_packs_sequentially() {
    let mut allocator = OffsetAllocator::new(512, 512);

    assert_eq!(allocator.allocate(700), Some(512));
    assert_eq!(allocator.allocate(10), Some(1536));
    assert_eq!(allocator.allocate(0), Some(2048));
    assert_eq!(allocator.allocate(512), Some(2048));
    assert_eq!(allocator.end(), 2560);
  }

  #[test]
  fn checked_align_up_reports_overflow() {
    assert_eq!(checked_align_up(700, 512), Some(1024));
    assert_eq!(checked_align_up(u64::MAX - 511, 512), Some(u64::MAX - 511));
    assert_eq!(checked_align_up(u64::MAX - 510, 512), None);
    assert_eq!(checked_align_up(u64::MAX, 512), None);
  }

  #[test]
  fn allocator_overflow_leaves_state_untouched() {
    let mut allocator = OffsetAllocator::new(512, u64::MAX - 1023);

    assert_eq!(allocator.allocate(1024), None);
    assert_eq!(allocator.end(), u64::MAX - 1023);
    assert_eq!(allocator.allocate(512), Some(u64::MAX - 1023));
  }
}
