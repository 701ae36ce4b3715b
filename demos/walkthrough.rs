use std::{ptr, time::Instant};

use arenalloc::{AllocError, DEFAULT_CAPACITY, FirstFitAllocator};
use clap::Parser;
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Walks through the allocator: a few allocations with heap layouts in
/// between, then a fragmentation pattern, a seeded stress run and a timing
/// loop. Every stage runs on the heap the previous one left behind.
#[derive(Parser, Debug)]
#[command(name = "walkthrough")]
struct Args {
  /// Arena capacity in bytes.
  #[arg(long, default_value_t = DEFAULT_CAPACITY)]
  capacity: usize,

  /// Seed for the stress pattern.
  #[arg(long, default_value_t = 42)]
  seed: u64,

  /// Iterations of the stress pattern.
  #[arg(long, default_value_t = 500)]
  stress_iterations: usize,

  /// Iterations of the timing loop.
  #[arg(long, default_value_t = 10_000)]
  bench_iterations: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let args = Args::parse();
  let mut allocator = FirstFitAllocator::new(args.capacity)?;

  println!("Initial:");
  println!("{}", allocator.dump());

  // --------------------------------------------------------------------
  // 1) Two allocations carved from the single initial block.
  // --------------------------------------------------------------------
  let a = allocator.allocate(200)?;
  let b = allocator.allocate(500)?;
  println!("After two allocations:");
  println!("{}", allocator.dump());

  // --------------------------------------------------------------------
  // 2) Free the first one, leaving a 200 byte hole at the front.
  // --------------------------------------------------------------------
  allocator.release(a.as_ptr())?;
  println!("After freeing first block:");
  println!("{}", allocator.dump());

  // --------------------------------------------------------------------
  // 3) 400 bytes do not fit the hole, first fit moves on past `b`.
  // --------------------------------------------------------------------
  let c = allocator.allocate(400)?;
  println!("After allocating 400 bytes:");
  println!("{}", allocator.dump());

  allocator.release(b.as_ptr())?;
  allocator.release(c.as_ptr())?;

  // `a` heads the merged free block by now.
  if let Err(error) = allocator.release(a.as_ptr()) {
    warn!(%error, "second release of the first block refused");
  }
  println!("{}", allocator.dump());

  fragmentation_pattern(&mut allocator)?;
  stress_pattern(&mut allocator, args.seed, args.stress_iterations);
  benchmark(&mut allocator, args.bench_iterations);

  Ok(())
}

fn fragmentation_pattern(allocator: &mut FirstFitAllocator) -> Result<(), AllocError> {
  println!("=== Fragmentation Test ===");

  let ptrs = (0..10)
    .map(|_| allocator.allocate(200))
    .collect::<Result<Vec<_>, _>>()?;

  for ptr in ptrs.iter().step_by(2) {
    allocator.release(ptr.as_ptr())?;
  }

  println!("{}", allocator.dump());
  println!(
    "Fragmentation Ratio: {:.2}%\n",
    allocator.fragmentation_ratio() * 100.0
  );

  Ok(())
}

fn stress_pattern(
  allocator: &mut FirstFitAllocator,
  seed: u64,
  iterations: usize,
) {
  println!("=== Stress Test ===");

  let mut rng = StdRng::seed_from_u64(seed);
  let mut ptrs = vec![ptr::null_mut::<u8>(); iterations];
  let mut failures = 0usize;

  for slot in ptrs.iter_mut() {
    let size = rng.gen_range(16..=271);
    match allocator.allocate(size) {
      Ok(ptr) => *slot = ptr.as_ptr(),
      Err(_) => failures += 1,
    }

    if rng.gen_ratio(1, 4) && !slot.is_null() {
      if let Err(error) = allocator.release(*slot) {
        warn!(%error, "stress release failed");
      }
      *slot = ptr::null_mut();
    }
  }

  allocator.log_dump();

  let stats = allocator.heap_stats();
  info!(
    used_blocks = stats.used_blocks,
    free_blocks = stats.free_blocks,
    total_used = stats.total_used,
    total_free = stats.total_free,
    failures,
    "stress pattern finished"
  );
  println!(
    "Post-stress fragmentation: {:.2}%\n",
    allocator.fragmentation_ratio() * 100.0
  );
}

fn benchmark(
  allocator: &mut FirstFitAllocator,
  iterations: usize,
) {
  println!("=== Performance Benchmark ===");

  let start = Instant::now();

  for i in 0..iterations {
    if let Ok(ptr) = allocator.allocate(32) {
      if i % 3 == 0 {
        if let Err(error) = allocator.release(ptr.as_ptr()) {
          warn!(%error, "benchmark release failed");
        }
      }
    }
  }

  let elapsed = start.elapsed();
  println!(
    "Performed {} allocations/frees in {:.3} seconds.\n",
    iterations,
    elapsed.as_secs_f64()
  );
}
