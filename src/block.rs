use std::{fmt, mem};

/// Tag stored in every live header. Absorbed headers are scrubbed to zero.
pub const BLOCK_MAGIC: u32 = 0xB10C_A11C;

/// Size of the in-band header that precedes every payload.
pub const HEADER_SIZE: usize = mem::size_of::<Block>();

/// Marks the last block of the list.
pub(crate) const NO_NEXT: usize = usize::MAX;

const STATE_FREE: u32 = 0;
const STATE_USED: u32 = 1;

/// Block header as laid out inside the arena.
///
/// `next` is the arena offset of the following header rather than a pointer,
/// so a header never refers outside the mapping it lives in. Every field is a
/// plain integer: any bit pattern read back from the arena is a valid `Block`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Block {
  pub size: usize,
  pub next: usize,
  pub magic: u32,
  pub state: u32,
}

impl Block {
  pub fn new(
    size: usize,
    state: BlockState,
    next: Option<usize>,
  ) -> Self {
    Self {
      size,
      next: next.unwrap_or(NO_NEXT),
      magic: BLOCK_MAGIC,
      state: state.to_raw(),
    }
  }

  pub fn next(&self) -> Option<usize> {
    (self.next != NO_NEXT).then_some(self.next)
  }

  pub fn set_next(
    &mut self,
    next: Option<usize>,
  ) {
    self.next = next.unwrap_or(NO_NEXT);
  }

  /// Invalidates a header that has been absorbed into its predecessor.
  pub fn scrub(&mut self) {
    self.magic = 0;
  }

  pub fn is_free(&self) -> bool {
    self.state == STATE_FREE
  }

  pub fn is_valid(&self) -> bool {
    self.magic == BLOCK_MAGIC && BlockState::from_raw(self.state).is_some()
  }

  pub fn state(&self) -> BlockState {
    if self.is_free() { BlockState::Free } else { BlockState::Used }
  }

  pub fn set_state(
    &mut self,
    state: BlockState,
  ) {
    self.state = state.to_raw();
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockState {
  Free,
  Used,
}

impl BlockState {
  fn to_raw(self) -> u32 {
    match self {
      BlockState::Free => STATE_FREE,
      BlockState::Used => STATE_USED,
    }
  }

  fn from_raw(raw: u32) -> Option<Self> {
    match raw {
      STATE_FREE => Some(BlockState::Free),
      STATE_USED => Some(BlockState::Used),
      _ => None,
    }
  }
}

impl fmt::Display for BlockState {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      BlockState::Free => f.write_str("FREE"),
      BlockState::Used => f.write_str("USED"),
    }
  }
}

/// Diagnostic snapshot of one block, as reported by a heap dump.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
  pub index: usize,
  /// Offset of the header from the start of the arena.
  pub offset: usize,
  /// Address of the header.
  pub address: usize,
  /// Payload capacity, excluding the header.
  pub size: usize,
  pub state: BlockState,
}

impl BlockInfo {
  /// Offset one past the last payload byte.
  pub fn end(&self) -> usize {
    self.offset + HEADER_SIZE + self.size
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_header_is_word_multiple() {
    assert_eq!(0, HEADER_SIZE % mem::size_of::<usize>());
  }

  #[test]
  fn test_next_sentinel() {
    let mut block = Block::new(64, BlockState::Free, None);
    assert_eq!(None, block.next());

    block.set_next(Some(128));
    assert_eq!(Some(128), block.next());
    assert!(block.is_free());
    assert!(block.is_valid());
  }

  #[test]
  fn test_rejects_unknown_state() {
    let mut block = Block::new(8, BlockState::Used, None);
    block.state = 7;
    assert!(!block.is_valid());

    block.state = STATE_USED;
    block.magic = 0;
    assert!(!block.is_valid());
  }
}
