//! # arenalloc - A Fixed-Arena First-Fit Allocator
//!
//! This crate provides an explicit free-list allocator that carves every
//! allocation out of one fixed-size arena, mapped once with `mmap(2)`.
//!
//! ## Overview
//!
//! The arena is partitioned into blocks. Each block starts with a header and
//! the headers are linked in address order, so the list covers the arena with
//! no gaps and no overlaps:
//!
//! ```text
//!   Arena (capacity bytes):
//!
//!   ┌────────┬──────────┬────────┬──────────────┬────────┬─────────────────┐
//!   │ header │ payload  │ header │   payload    │ header │    payload      │
//!   │  USED  │  size=A  │  FREE  │    size=B    │  USED  │    size=C       │
//!   └────────┴──────────┴────────┴──────────────┴────────┴─────────────────┘
//!   0   │                   ▲ │                    ▲                  capacity
//!       └── next ───────────┘ └── next ────────────┘
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   arenalloc
//!   ├── align      - Alignment macro (align_to!)
//!   ├── arena      - mmap-backed buffer, header reads and writes (internal)
//!   ├── block      - Block header, states and dump records
//!   ├── config     - ArenaConfig
//!   ├── error      - AllocError, ArenaError, IntegrityError
//!   ├── first_fit  - FirstFitAllocator: allocate, split, release, coalesce
//!   └── stats      - HeapStats, fragmentation ratio, heap dumps
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use arenalloc::FirstFitAllocator;
//!
//! let mut allocator = FirstFitAllocator::new(64 * 1024).unwrap();
//!
//! let ptr = allocator.allocate(200).unwrap();
//! allocator.payload_mut(ptr).unwrap()[0] = 42;
//!
//! println!("{}", allocator.dump());
//!
//! allocator.release(ptr.as_ptr()).unwrap();
//! assert_eq!(0.0, allocator.fragmentation_ratio());
//! ```
//!
//! ## How It Works
//!
//! Allocation walks the list from the start and takes the first free block
//! that is large enough. If what is left after the request can hold another
//! header plus a minimum payload, the block is split:
//!
//! ```text
//!   allocate(n) on a free block of size S:
//!
//!   ┌────────┬─────────────────────────────────────┐
//!   │  FREE  │               S bytes               │
//!   └────────┴─────────────────────────────────────┘
//!                         │
//!                         ▼
//!   ┌────────┬───────────┬────────┬────────────────┐
//!   │  USED  │  n bytes  │  FREE  │ S - n - header │
//!   └────────┴───────────┴────────┴────────────────┘
//!            ▲
//!            └── pointer returned to the caller
//! ```
//!
//! Release marks the block free and then merges every run of adjacent free
//! blocks, so two free blocks are never neighbours.
//!
//! ## Limitations
//!
//! - **Single-threaded**: the allocator is `Send` but not `Sync`
//! - **Fixed size**: the arena never grows
//! - **No alignment beyond bytes**: payloads start right after a header
//! - **Unix-only**: requires `libc` and `mmap`
//!
//! ## Safety
//!
//! The allocator hands out raw pointers. Reading and writing through them is
//! up to the caller, who must stay within the requested size; `payload` and
//! `payload_mut` give checked slice access instead. Releasing is checked: a
//! pointer that does not belong to a live allocation is rejected with an
//! error and leaves the arena untouched.

pub mod align;
mod arena;
mod block;
mod config;
mod error;
mod first_fit;
mod stats;

pub use block::{BLOCK_MAGIC, BlockInfo, BlockState, HEADER_SIZE};
pub use config::{ArenaConfig, DEFAULT_CAPACITY, DEFAULT_MIN_SPLIT_PAYLOAD};
pub use error::{AllocError, ArenaError, IntegrityError};
pub use first_fit::FirstFitAllocator;
pub use stats::{HeapDump, HeapStats};
