use crate::{block::HEADER_SIZE, error::ArenaError};

/// Arena capacity used when none is given.
pub const DEFAULT_CAPACITY: usize = 64 * 1024;

/// Smallest payload a split is allowed to leave behind.
pub const DEFAULT_MIN_SPLIT_PAYLOAD: usize = 8;

/// Construction parameters for a [`FirstFitAllocator`](crate::FirstFitAllocator).
///
/// ```rust
/// use arenalloc::ArenaConfig;
///
/// let config = ArenaConfig::default().capacity(4096).min_split_payload(16);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
  pub capacity: usize,
  pub min_split_payload: usize,
}

impl Default for ArenaConfig {
  fn default() -> Self {
    Self {
      capacity: DEFAULT_CAPACITY,
      min_split_payload: DEFAULT_MIN_SPLIT_PAYLOAD,
    }
  }
}

impl ArenaConfig {
  pub fn capacity(
    mut self,
    capacity: usize,
  ) -> Self {
    self.capacity = capacity;
    self
  }

  pub fn min_split_payload(
    mut self,
    min_split_payload: usize,
  ) -> Self {
    self.min_split_payload = min_split_payload;
    self
  }

  /// The arena has to hold at least one header and one payload byte.
  pub fn validate(&self) -> Result<(), ArenaError> {
    let minimum = HEADER_SIZE + 1;
    if self.capacity < minimum {
      return Err(ArenaError::TooSmall {
        capacity: self.capacity,
        minimum,
      });
    }

    // Leaves room for rounding the mapping up to a page.
    let maximum = isize::MAX as usize / 2;
    if self.capacity > maximum {
      return Err(ArenaError::TooLarge {
        capacity: self.capacity,
        maximum,
      });
    }

    if self.min_split_payload > self.capacity {
      return Err(ArenaError::SplitThresholdTooLarge {
        min_split_payload: self.min_split_payload,
        capacity: self.capacity,
      });
    }

    Ok(())
  }
}
