use std::fmt;

use tracing::debug;

use crate::{
  block::{BlockInfo, HEADER_SIZE},
  error::IntegrityError,
  first_fit::FirstFitAllocator,
};

/// Byte and block totals over the whole arena.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapStats {
  pub total_free: usize,
  pub total_used: usize,
  pub free_blocks: usize,
  pub used_blocks: usize,
  /// Payload size of the largest free block.
  pub largest_free: usize,
}

impl HeapStats {
  pub fn block_count(&self) -> usize {
    self.free_blocks + self.used_blocks
  }

  /// Bytes spent on headers.
  pub fn overhead(&self) -> usize {
    self.block_count() * HEADER_SIZE
  }

  /// `1 - largest_free / total_free`, or `0.0` when nothing is free.
  ///
  /// `0.0` means every free byte sits in one block; values close to `1.0` mean
  /// free memory is scattered over blocks much smaller than the total.
  pub fn fragmentation_ratio(&self) -> f64 {
    if self.total_free == 0 {
      return 0.0;
    }

    1.0 - (self.largest_free as f64 / self.total_free as f64)
  }
}

/// Snapshot of the block list in address order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeapDump {
  pub blocks: Vec<BlockInfo>,
}

impl HeapDump {
  pub fn iter(&self) -> std::slice::Iter<'_, BlockInfo> {
    self.blocks.iter()
  }

  pub fn len(&self) -> usize {
    self.blocks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.blocks.is_empty()
  }
}

impl fmt::Display for HeapDump {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    writeln!(f, "Heap layout:")?;

    for block in &self.blocks {
      writeln!(
        f,
        "  [{:02}] addr={:#x} | size={} | {}",
        block.index, block.address, block.size, block.state
      )?;
    }

    Ok(())
  }
}

impl FirstFitAllocator {
  /// Totals in a single pass over the list.
  pub fn heap_stats(&self) -> HeapStats {
    self
      .blocks()
      .fold(HeapStats::default(), |mut stats, (_, block)| {
        if block.is_free() {
          stats.total_free += block.size;
          stats.free_blocks += 1;
          stats.largest_free = stats.largest_free.max(block.size);
        } else {
          stats.total_used += block.size;
          stats.used_blocks += 1;
        }

        stats
      })
  }

  pub fn fragmentation_ratio(&self) -> f64 {
    self.heap_stats().fragmentation_ratio()
  }

  pub fn dump(&self) -> HeapDump {
    let blocks = self
      .blocks()
      .enumerate()
      .map(|(index, (offset, block))| BlockInfo {
        index,
        offset,
        address: self.arena.address_of(offset),
        size: block.size,
        state: block.state(),
      })
      .collect();

    HeapDump { blocks }
  }

  /// Emits the current layout at debug level, one event per block.
  pub fn log_dump(&self) {
    for block in self.dump().iter() {
      debug!(
        index = block.index,
        address = format_args!("{:#x}", block.address),
        size = block.size,
        state = %block.state,
        "heap block"
      );
    }
  }

  /// Verifies that the list partitions the arena, that every header carries a
  /// valid tag and that no two neighbours are both free.
  pub fn check_integrity(&self) -> Result<(), IntegrityError> {
    let capacity = self.arena.capacity();
    let mut previous_free = false;

    for (index, (offset, block)) in self.blocks().enumerate() {
      if !block.is_valid() {
        return Err(IntegrityError::CorruptHeader { index, offset });
      }

      if previous_free && block.is_free() {
        return Err(IntegrityError::AdjacentFree { index: index - 1 });
      }
      previous_free = block.is_free();

      let end = offset
        .saturating_add(HEADER_SIZE)
        .saturating_add(block.size);
      if end > capacity {
        return Err(IntegrityError::BadEnd { end, capacity });
      }

      match block.next() {
        Some(next) if next != end => {
          return Err(IntegrityError::Gap {
            index,
            next,
            expected: end,
          });
        },
        Some(_) if end + HEADER_SIZE > capacity => {
          return Err(IntegrityError::BadEnd { end, capacity });
        },
        None if end != capacity => {
          return Err(IntegrityError::BadEnd { end, capacity });
        },
        _ => {},
      }
    }

    Ok(())
  }
}
