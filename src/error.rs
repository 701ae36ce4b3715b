//! Error types for arena construction and allocator operations.

use std::io;

use thiserror::Error;

/// Failure of an allocate or release call.
///
/// A call that returns one of these leaves the block list untouched.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
  /// Zero-sized request, or a request no arena of this capacity could satisfy.
  #[error("invalid allocation size {requested} for an arena of {capacity} bytes")]
  InvalidArgument { requested: usize, capacity: usize },

  /// No free block is large enough.
  #[error("out of memory: no free block of {requested} bytes")]
  OutOfMemory { requested: usize },

  /// The pointer is not the payload address of any block in this arena.
  #[error("pointer {address:#x} was not allocated from this arena")]
  InvalidPointer { address: usize },

  /// The block behind the pointer is already free.
  #[error("pointer {address:#x} has already been released")]
  DoubleFree { address: usize },
}

/// Failure to set up an arena.
#[derive(Debug, Error)]
pub enum ArenaError {
  #[error("arena capacity {capacity} is too small, need at least {minimum} bytes")]
  TooSmall { capacity: usize, minimum: usize },

  #[error("arena capacity {capacity} exceeds the addressable maximum of {maximum} bytes")]
  TooLarge { capacity: usize, maximum: usize },

  #[error("minimum split payload {min_split_payload} exceeds arena capacity {capacity}")]
  SplitThresholdTooLarge {
    min_split_payload: usize,
    capacity: usize,
  },

  #[error("failed to map arena: {0}")]
  MapFailed(#[from] io::Error),
}

/// A broken block-list invariant found by an integrity check.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntegrityError {
  #[error("block {index} at offset {offset:#x} has a corrupt header")]
  CorruptHeader { index: usize, offset: usize },

  #[error("block {index} links to {next:#x}, expected {expected:#x}")]
  Gap {
    index: usize,
    next: usize,
    expected: usize,
  },

  #[error("blocks end at {end:#x}, arena ends at {capacity:#x}")]
  BadEnd { end: usize, capacity: usize },

  #[error("blocks {index} and {next} are both free", next = .index + 1)]
  AdjacentFree { index: usize },
}
