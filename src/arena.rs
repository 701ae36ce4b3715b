use std::{
  io,
  ptr::{self, NonNull},
  slice,
};

use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE, c_void, mmap, munmap};

use crate::{
  align_to,
  block::{Block, HEADER_SIZE},
  error::ArenaError,
};

const FALLBACK_PAGE_SIZE: usize = 4096;

pub(crate) fn page_size() -> usize {
  let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };

  if size > 0 { size as usize } else { FALLBACK_PAGE_SIZE }
}

/// The fixed backing buffer every block is carved from.
///
/// The buffer is an anonymous private mapping, so the allocator never goes
/// through the host heap. Only the first `capacity` bytes are handed out; the
/// mapping itself is rounded up to whole pages.
///
/// Headers are read and written unaligned: a payload of any length may be
/// followed directly by the next header.
pub(crate) struct Arena {
  base: NonNull<u8>,
  capacity: usize,
  mapped_len: usize,
}

// The mapping is exclusively owned by the arena and not tied to any thread.
unsafe impl Send for Arena {}

impl Arena {
  pub fn map(capacity: usize) -> Result<Self, ArenaError> {
    let page = page_size();
    let mapped_len = align_to!(capacity, page);

    let address = unsafe {
      mmap(
        ptr::null_mut(),
        mapped_len,
        PROT_READ | PROT_WRITE,
        MAP_PRIVATE | MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if address == MAP_FAILED {
      return Err(ArenaError::MapFailed(io::Error::last_os_error()));
    }

    let base = NonNull::new(address.cast::<u8>())
      .ok_or_else(|| ArenaError::MapFailed(io::Error::other("mmap returned a null mapping")))?;

    Ok(Self {
      base,
      capacity,
      mapped_len,
    })
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn base_addr(&self) -> usize {
    self.base.as_ptr() as usize
  }

  pub fn address_of(
    &self,
    offset: usize,
  ) -> usize {
    self.base_addr() + offset
  }

  /// Translates an address back into an arena offset.
  pub fn offset_of(
    &self,
    address: usize,
  ) -> Option<usize> {
    address
      .checked_sub(self.base_addr())
      .filter(|offset| *offset < self.capacity)
  }

  pub fn payload_ptr(
    &self,
    offset: usize,
  ) -> NonNull<u8> {
    assert!(offset + HEADER_SIZE <= self.capacity);

    unsafe { self.base.add(offset + HEADER_SIZE) }
  }

  pub fn read(
    &self,
    offset: usize,
  ) -> Block {
    assert!(
      offset + HEADER_SIZE <= self.capacity,
      "block header at offset {offset} lies outside the arena"
    );

    unsafe { ptr::read_unaligned(self.base.as_ptr().add(offset).cast::<Block>()) }
  }

  pub fn write(
    &mut self,
    offset: usize,
    block: Block,
  ) {
    assert!(
      offset + HEADER_SIZE <= self.capacity,
      "block header at offset {offset} lies outside the arena"
    );

    unsafe { ptr::write_unaligned(self.base.as_ptr().add(offset).cast::<Block>(), block) }
  }

  pub fn bytes(
    &self,
    offset: usize,
    len: usize,
  ) -> &[u8] {
    assert!(offset + len <= self.capacity);

    unsafe { slice::from_raw_parts(self.base.as_ptr().add(offset), len) }
  }

  pub fn bytes_mut(
    &mut self,
    offset: usize,
    len: usize,
  ) -> &mut [u8] {
    assert!(offset + len <= self.capacity);

    unsafe { slice::from_raw_parts_mut(self.base.as_ptr().add(offset), len) }
  }
}

impl Drop for Arena {
  fn drop(&mut self) {
    unsafe {
      munmap(self.base.as_ptr().cast::<c_void>(), self.mapped_len);
    }
  }
}
