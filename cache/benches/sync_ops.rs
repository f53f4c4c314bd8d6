use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fibre_authcache::{Cache, CacheBuilder};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

const NUM_ITEMS: u64 = 10_000;

fn new_bench_cache(entry_limit: usize) -> Arc<Cache<u64, u64>> {
  let cache = Arc::new(
    CacheBuilder::default()
      .initial_size(1_024)
      .entry_limit(entry_limit)
      .no_timeout()
      .build()
      .unwrap(),
  );
  for i in 0..NUM_ITEMS {
    cache.insert(i, i).unwrap();
  }
  cache
}

// Splits `keys` across `concurrency` threads and times `iters` passes.
fn run_threads<F>(cache: &Arc<Cache<u64, u64>>, keys: &[u64], concurrency: usize, iters: u64, op: F) -> Duration
where
  F: Fn(&Cache<u64, u64>, u64) + Send + Sync + Copy + 'static,
{
  let barrier = Arc::new(Barrier::new(concurrency + 1));
  let handles: Vec<_> = (0..concurrency)
    .map(|t| {
      let cache = cache.clone();
      let barrier = barrier.clone();
      let keys: Vec<u64> = keys.iter().copied().skip(t).step_by(concurrency).collect();
      thread::spawn(move || {
        barrier.wait();
        for _ in 0..iters {
          for key in &keys {
            op(&cache, *key);
          }
        }
      })
    })
    .collect();

  let start = Instant::now();
  barrier.wait();
  for handle in handles {
    handle.join().unwrap();
  }
  start.elapsed()
}

fn bench_sync_ops(c: &mut Criterion) {
  let mut group = c.benchmark_group("SyncOps");
  group.throughput(Throughput::Elements(NUM_ITEMS));

  for concurrency in [1, 4] {
    let hits: Vec<u64> = (0..NUM_ITEMS).collect();
    let misses: Vec<u64> = (NUM_ITEMS..2 * NUM_ITEMS).collect();

    group.bench_with_input(BenchmarkId::new("GetHit", concurrency), &concurrency, |b, &n| {
      let cache = new_bench_cache(usize::MAX);
      b.iter_custom(|iters| {
        run_threads(&cache, &hits, n, iters, |cache, key| {
          black_box(cache.get(&key).unwrap());
        })
      });
    });

    group.bench_with_input(BenchmarkId::new("GetMiss", concurrency), &concurrency, |b, &n| {
      let cache = new_bench_cache(usize::MAX);
      b.iter_custom(|iters| {
        run_threads(&cache, &misses, n, iters, |cache, key| {
          black_box(cache.get(&key).unwrap());
        })
      });
    });

    // Bounded, so inserts keep paying for capacity rotations.
    group.bench_with_input(BenchmarkId::new("Insert", concurrency), &concurrency, |b, &n| {
      let cache = new_bench_cache(NUM_ITEMS as usize);
      b.iter_custom(|iters| {
        run_threads(&cache, &misses, n, iters, |cache, key| {
          cache.insert(key, key).unwrap();
        })
      });
    });
  }

  group.finish();
}

criterion_group!(benches, bench_sync_ops);
criterion_main!(benches);
