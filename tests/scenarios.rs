use std::{
  ptr::NonNull,
  sync::{Arc, Mutex},
  thread,
};

use arenalloc::{
  AllocError, ArenaConfig, ArenaError, BlockState, DEFAULT_CAPACITY, FirstFitAllocator, HEADER_SIZE,
};

fn layout(allocator: &FirstFitAllocator) -> Vec<(usize, BlockState)> {
  allocator
    .dump()
    .iter()
    .map(|block| (block.size, block.state))
    .collect()
}

/// Lays out free blocks of 50, 30 and 100 bytes separated by used blocks.
fn three_holes() -> (FirstFitAllocator, [NonNull<u8>; 3]) {
  let sizes = [50, 10, 30, 10, 100, 10];
  let capacity = sizes.iter().map(|size| HEADER_SIZE + size).sum();
  let mut allocator = FirstFitAllocator::new(capacity).unwrap();

  let ptrs: Vec<_> = sizes
    .iter()
    .map(|size| allocator.allocate(*size).unwrap())
    .collect();

  for hole in [0, 2, 4] {
    allocator.release(ptrs[hole].as_ptr()).unwrap();
  }

  (allocator, [ptrs[0], ptrs[2], ptrs[4]])
}

#[test]
fn test_first_fit_takes_first_adequate_block() {
  let (mut allocator, [fifty, thirty, hundred]) = three_holes();

  assert_eq!(
    vec![
      (50, BlockState::Free),
      (10, BlockState::Used),
      (30, BlockState::Free),
      (10, BlockState::Used),
      (100, BlockState::Free),
      (10, BlockState::Used),
    ],
    layout(&allocator)
  );

  assert_eq!(fifty, allocator.allocate(20).unwrap());
  assert_eq!(thirty, allocator.allocate(30).unwrap());
  assert_eq!(hundred, allocator.allocate(31).unwrap());
}

#[test]
fn test_split_leaves_exact_remainder() {
  let leftover = 12;
  let capacity = HEADER_SIZE + 50 + HEADER_SIZE + leftover;
  let mut allocator = FirstFitAllocator::new(capacity).unwrap();

  allocator.allocate(50).unwrap();

  assert_eq!(
    vec![(50, BlockState::Used), (leftover, BlockState::Free)],
    layout(&allocator)
  );
}

#[test]
fn test_no_split_when_leftover_is_negative() {
  let mut allocator = FirstFitAllocator::new(HEADER_SIZE + 70).unwrap();

  let ptr = allocator.allocate(65).unwrap();

  assert_eq!(vec![(70, BlockState::Used)], layout(&allocator));
  assert_eq!(70, allocator.payload(ptr).unwrap().len());
}

#[test]
fn test_no_split_below_minimum_payload() {
  let min = ArenaConfig::default().min_split_payload;
  let capacity = HEADER_SIZE + 50 + HEADER_SIZE + min - 1;
  let mut allocator = FirstFitAllocator::new(capacity).unwrap();

  allocator.allocate(50).unwrap();

  assert_eq!(
    vec![(50 + HEADER_SIZE + min - 1, BlockState::Used)],
    layout(&allocator)
  );
}

#[test]
fn test_exhaustion_leaves_arena_unchanged() {
  let n = 256;
  let mut allocator = FirstFitAllocator::new(HEADER_SIZE + n).unwrap();
  let before = allocator.heap_stats();

  assert_eq!(
    Err(AllocError::OutOfMemory { requested: n + 1 }),
    allocator.allocate(n + 1)
  );
  assert_eq!(before, allocator.heap_stats());

  allocator.allocate(n).unwrap();
  assert_eq!(
    Err(AllocError::OutOfMemory { requested: 1 }),
    allocator.allocate(1)
  );
  assert!(allocator.check_integrity().is_ok());
}

#[test]
fn test_zero_size_is_rejected() {
  let mut allocator = FirstFitAllocator::new(1024).unwrap();
  allocator.allocate(64).unwrap();
  let before = allocator.dump();

  assert_eq!(
    Err(AllocError::InvalidArgument {
      requested: 0,
      capacity: 1024
    }),
    allocator.allocate(0)
  );
  assert_eq!(before, allocator.dump());
}

#[test]
fn test_oversized_request_is_rejected() {
  let mut allocator = FirstFitAllocator::new(1024).unwrap();

  assert!(matches!(
    allocator.allocate(1025),
    Err(AllocError::InvalidArgument { requested: 1025, .. })
  ));
  assert!(matches!(
    allocator.allocate(1024),
    Err(AllocError::OutOfMemory { requested: 1024 })
  ));
}

#[test]
fn test_release_null_is_noop() {
  let mut allocator = FirstFitAllocator::new(1024).unwrap();
  allocator.allocate(64).unwrap();
  let before = allocator.dump();

  assert_eq!(Ok(()), allocator.release(std::ptr::null_mut()));
  assert_eq!(before, allocator.dump());
}

#[test]
fn test_release_rejects_foreign_pointer() {
  let mut allocator = FirstFitAllocator::new(1024).unwrap();
  let mut other = FirstFitAllocator::new(1024).unwrap();
  allocator.allocate(64).unwrap();
  let before = allocator.dump();

  let mut local = [0u8; 16];
  let foreign = other.allocate(64).unwrap();

  for ptr in [local.as_mut_ptr(), foreign.as_ptr()] {
    assert_eq!(
      Err(AllocError::InvalidPointer {
        address: ptr as usize
      }),
      allocator.release(ptr)
    );
  }
  assert_eq!(before, allocator.dump());
}

#[test]
fn test_release_rejects_interior_pointer() {
  let mut allocator = FirstFitAllocator::new(1024).unwrap();
  let ptr = allocator.allocate(64).unwrap();
  let before = allocator.dump();

  let interior = unsafe { ptr.as_ptr().add(8) };

  assert!(matches!(
    allocator.release(interior),
    Err(AllocError::InvalidPointer { .. })
  ));
  assert_eq!(before, allocator.dump());
}

#[test]
fn test_release_rejects_header_pointer() {
  let mut allocator = FirstFitAllocator::new(1024).unwrap();
  let ptr = allocator.allocate(64).unwrap();

  let header = unsafe { ptr.as_ptr().sub(HEADER_SIZE) };

  assert!(matches!(
    allocator.release(header),
    Err(AllocError::InvalidPointer { .. })
  ));
}

#[test]
fn test_double_free_is_detected() {
  let mut allocator = FirstFitAllocator::new(1024).unwrap();
  let _a = allocator.allocate(64).unwrap();
  let b = allocator.allocate(64).unwrap();

  allocator.release(b.as_ptr()).unwrap();
  let before = allocator.dump();

  assert_eq!(
    Err(AllocError::DoubleFree {
      address: b.as_ptr() as usize
    }),
    allocator.release(b.as_ptr())
  );
  assert_eq!(before, allocator.dump());
}

#[test]
fn test_original_walkthrough() {
  let mut allocator = FirstFitAllocator::new(DEFAULT_CAPACITY).unwrap();

  let a = allocator.allocate(200).unwrap();
  let b = allocator.allocate(500).unwrap();
  allocator.release(a.as_ptr()).unwrap();

  // 400 bytes do not fit in the 200 byte hole.
  let c = allocator.allocate(400).unwrap();
  assert!(c > b);
  assert_eq!(BlockState::Free, allocator.dump().blocks[0].state);

  allocator.release(b.as_ptr()).unwrap();
  allocator.release(c.as_ptr()).unwrap();

  assert_eq!(1, allocator.block_count());
  assert_eq!(DEFAULT_CAPACITY - HEADER_SIZE, allocator.heap_stats().total_free);
}

#[test]
fn test_fragmentation_pattern() {
  let mut allocator = FirstFitAllocator::new(DEFAULT_CAPACITY).unwrap();

  let ptrs: Vec<_> = (0..10).map(|_| allocator.allocate(200).unwrap()).collect();
  for ptr in ptrs.iter().step_by(2) {
    allocator.release(ptr.as_ptr()).unwrap();
  }

  let stats = allocator.heap_stats();
  let tail = DEFAULT_CAPACITY - 11 * HEADER_SIZE - 10 * 200;

  assert_eq!(6, stats.free_blocks);
  assert_eq!(5, stats.used_blocks);
  assert_eq!(tail, stats.largest_free);
  assert_eq!(1000 + tail, stats.total_free);

  let expected = 1.0 - tail as f64 / (1000 + tail) as f64;
  assert!((allocator.fragmentation_ratio() - expected).abs() < 1e-12);
}

#[test]
fn test_fragmentation_zero_when_full() {
  let mut allocator = FirstFitAllocator::new(HEADER_SIZE + 64).unwrap();
  allocator.allocate(64).unwrap();

  assert_eq!(0, allocator.heap_stats().total_free);
  assert_eq!(0.0, allocator.fragmentation_ratio());
}

#[test]
fn test_construction_errors() {
  assert!(matches!(
    FirstFitAllocator::new(HEADER_SIZE),
    Err(ArenaError::TooSmall { .. })
  ));
  assert!(matches!(
    FirstFitAllocator::new(usize::MAX),
    Err(ArenaError::TooLarge { .. })
  ));
}

#[test]
fn test_independent_instances() {
  let mut first = FirstFitAllocator::new(1024).unwrap();
  let mut second = FirstFitAllocator::new(1024).unwrap();

  first.allocate(100).unwrap();

  assert_eq!(2, first.block_count());
  assert_eq!(1, second.block_count());

  second.allocate(10).unwrap();
  assert_eq!(2, first.block_count());
}

#[test]
fn test_shared_behind_mutex() {
  let allocator = Arc::new(Mutex::new(FirstFitAllocator::new(DEFAULT_CAPACITY).unwrap()));

  let workers: Vec<_> = (0..4)
    .map(|_| {
      let allocator = Arc::clone(&allocator);
      thread::spawn(move || {
        for size in 1..64 {
          let mut allocator = allocator.lock().unwrap();
          let ptr = allocator.allocate(size).unwrap();
          allocator.release(ptr.as_ptr()).unwrap();
        }
      })
    })
    .collect();

  for worker in workers {
    worker.join().unwrap();
  }

  let allocator = allocator.lock().unwrap();
  assert_eq!(1, allocator.block_count());
  assert!(allocator.check_integrity().is_ok());
}
