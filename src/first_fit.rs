use std::{fmt, ptr::NonNull};

use tracing::{debug, trace, warn};

use crate::{
  arena::Arena,
  block::{Block, BlockState, HEADER_SIZE},
  config::ArenaConfig,
  error::{AllocError, ArenaError},
};

/// First-fit allocator over a single fixed arena.
///
/// Every block, free or used, is linked in address order through headers
/// stored in the arena itself. The list is both the allocation index and the
/// memory map: block `n + 1` starts exactly where block `n`'s payload ends.
pub struct FirstFitAllocator {
  pub(crate) arena: Arena,
  min_split_payload: usize,
}

impl FirstFitAllocator {
  /// Maps an arena of `capacity` bytes and initialises it as one free block.
  pub fn new(capacity: usize) -> Result<Self, ArenaError> {
    Self::with_config(ArenaConfig::default().capacity(capacity))
  }

  pub fn with_config(config: ArenaConfig) -> Result<Self, ArenaError> {
    config.validate()?;

    let mut allocator = Self {
      arena: Arena::map(config.capacity)?,
      min_split_payload: config.min_split_payload,
    };
    allocator.init();

    Ok(allocator)
  }

  /// Resets the arena to a single free block spanning all of it.
  ///
  /// Every outstanding allocation is discarded. Pointers handed out before the
  /// reset are rejected by [`release`](Self::release) afterwards, unless the
  /// same address has since been allocated again.
  pub fn init(&mut self) {
    let size = self.arena.capacity() - HEADER_SIZE;
    self.arena.write(0, Block::new(size, BlockState::Free, None));

    debug!(capacity = self.arena.capacity(), payload = size, "arena initialised");
  }

  pub fn capacity(&self) -> usize {
    self.arena.capacity()
  }

  pub fn min_split_payload(&self) -> usize {
    self.min_split_payload
  }

  pub fn block_count(&self) -> usize {
    self.blocks().count()
  }

  pub(crate) fn blocks(&self) -> Blocks<'_> {
    Blocks {
      arena: &self.arena,
      next: Some(0),
    }
  }

  /// Returns the offset of the first free block that can hold `size` bytes.
  pub fn find_first_fit(
    &self,
    size: usize,
  ) -> Option<usize> {
    self
      .blocks()
      .find(|(_, block)| block.is_free() && block.size >= size)
      .map(|(offset, _)| offset)
  }

  /// Carves a free remainder off the block at `offset`, leaving it exactly
  /// `size` bytes long.
  ///
  /// Nothing happens unless the remainder can hold a header plus
  /// `min_split_payload` bytes; the block is then handed out oversized.
  pub(crate) fn split_block(
    &mut self,
    offset: usize,
    size: usize,
  ) -> bool {
    let mut block = self.arena.read(offset);

    let needed = size
      .checked_add(HEADER_SIZE)
      .and_then(|needed| needed.checked_add(self.min_split_payload));

    match needed {
      Some(needed) if block.size >= needed => {},
      _ => return false,
    }

    let remainder = offset + HEADER_SIZE + size;
    self.arena.write(
      remainder,
      Block::new(block.size - size - HEADER_SIZE, BlockState::Free, block.next()),
    );

    block.size = size;
    block.set_next(Some(remainder));
    self.arena.write(offset, block);

    true
  }

  /// Hands out the first free block large enough for `size` bytes.
  ///
  /// On failure the block list is left as it was.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    if size == 0 || size > self.arena.capacity() {
      return Err(AllocError::InvalidArgument {
        requested: size,
        capacity: self.arena.capacity(),
      });
    }

    let Some(offset) = self.find_first_fit(size) else {
      trace!(size, "no free block fits");
      return Err(AllocError::OutOfMemory { requested: size });
    };

    let split = self.split_block(offset, size);

    let mut block = self.arena.read(offset);
    block.set_state(BlockState::Used);
    self.arena.write(offset, block);

    trace!(size, offset, split, "allocated");

    Ok(self.arena.payload_ptr(offset))
  }

  /// Returns the block behind `ptr` to the free list and merges free
  /// neighbours.
  ///
  /// A null pointer is ignored. Any other pointer must be a payload address
  /// returned by [`allocate`](Self::allocate) that has not been released yet;
  /// anything else is rejected without touching the list. Releasing a block
  /// whose free predecessor has already absorbed it reports
  /// [`AllocError::InvalidPointer`] rather than [`AllocError::DoubleFree`].
  pub fn release(
    &mut self,
    ptr: *mut u8,
  ) -> Result<(), AllocError> {
    if ptr.is_null() {
      return Ok(());
    }

    let offset = self
      .locate(ptr as usize)
      .inspect_err(|error| warn!(%error, "release rejected"))?;

    let mut block = self.arena.read(offset);
    block.set_state(BlockState::Free);
    self.arena.write(offset, block);

    trace!(offset, size = block.size, "released");

    self.coalesce_adjacent_free_blocks();

    Ok(())
  }

  /// Merges every run of adjacent free blocks into its first block.
  pub fn coalesce_adjacent_free_blocks(&mut self) {
    let mut merged = 0usize;
    let mut offset = 0;

    loop {
      let mut block = self.arena.read(offset);
      let Some(next_offset) = block.next() else {
        break;
      };
      let mut next = self.arena.read(next_offset);

      if block.is_free() && next.is_free() {
        block.size += HEADER_SIZE + next.size;
        block.set_next(next.next());
        self.arena.write(offset, block);

        next.scrub();
        self.arena.write(next_offset, next);

        merged += 1;
      } else {
        offset = next_offset;
      }
    }

    if merged > 0 {
      trace!(merged, "coalesced free blocks");
    }
  }

  /// Read-only view of a live allocation's payload.
  pub fn payload(
    &self,
    ptr: NonNull<u8>,
  ) -> Result<&[u8], AllocError> {
    let offset = self.locate(ptr.as_ptr() as usize)?;
    let size = self.arena.read(offset).size;

    Ok(self.arena.bytes(offset + HEADER_SIZE, size))
  }

  pub fn payload_mut(
    &mut self,
    ptr: NonNull<u8>,
  ) -> Result<&mut [u8], AllocError> {
    let offset = self.locate(ptr.as_ptr() as usize)?;
    let size = self.arena.read(offset).size;

    Ok(self.arena.bytes_mut(offset + HEADER_SIZE, size))
  }

  /// Finds the used block whose payload starts at `address`.
  fn locate(
    &self,
    address: usize,
  ) -> Result<usize, AllocError> {
    let invalid = AllocError::InvalidPointer { address };

    let header = self
      .arena
      .offset_of(address)
      .and_then(|offset| offset.checked_sub(HEADER_SIZE))
      .ok_or(invalid)?;

    let (offset, block) = self
      .blocks()
      .take_while(|(offset, _)| *offset <= header)
      .find(|(offset, _)| *offset == header)
      .ok_or(invalid)?;

    if !block.is_valid() {
      return Err(invalid);
    }

    if block.is_free() {
      return Err(AllocError::DoubleFree { address });
    }

    Ok(offset)
  }
}

impl fmt::Debug for FirstFitAllocator {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("FirstFitAllocator")
      .field("base", &format_args!("{:#x}", self.arena.base_addr()))
      .field("capacity", &self.arena.capacity())
      .field("min_split_payload", &self.min_split_payload)
      .field("blocks", &self.block_count())
      .finish()
  }
}

/// Walks the block list in address order, yielding `(offset, header)`.
pub(crate) struct Blocks<'a> {
  arena: &'a Arena,
  next: Option<usize>,
}

impl Iterator for Blocks<'_> {
  type Item = (usize, Block);

  fn next(&mut self) -> Option<Self::Item> {
    let offset = self.next?;
    let block = self.arena.read(offset);

    // Links only ever point forward; anything else ends the walk.
    self.next = block.next().filter(|next| *next > offset);

    Some((offset, block))
  }
}
