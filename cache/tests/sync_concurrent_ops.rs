mod common;

use common::Recorder;
use fibre_authcache::{Cache, CacheBuilder, Generation};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn test_sync_concurrent_misses_share_one_placeholder_then_race_insert() {
  let cache: Arc<Cache<&'static str, u64>> =
    Arc::new(CacheBuilder::default().no_timeout().build().unwrap());

  let num_threads = 8;
  let barrier = Arc::new(Barrier::new(num_threads));
  let mut handles = vec![];

  for t in 0..num_threads {
    let cache_clone = cache.clone();
    let barrier_clone = barrier.clone();
    handles.push(thread::spawn(move || {
      barrier_clone.wait();
      let entry = cache_clone.lookup(&"token").unwrap();
      // Every thread has looked up before any of them inserts.
      barrier_clone.wait();
      cache_clone.insert("token", t as u64).unwrap();
      entry
    }));
  }

  let entries: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
  for entry in &entries {
    assert!(entry.is_placeholder());
    assert!(Arc::ptr_eq(entry, &entries[0]), "every miss must see the same entry");
  }

  assert_eq!(cache.len(), 1);
  assert_eq!(cache.generation_of(&"token"), Some(Generation::Primary));
  let winner = cache.get(&"token").unwrap().expect("one insert wins");
  assert!(*winner < num_threads as u64);

  let metrics = cache.metrics();
  assert_eq!(metrics.misses, num_threads as u64);
  assert_eq!(metrics.inserts, num_threads as u64);
  // Only inserts after the first overwrite a resolved value.
  assert_eq!(metrics.replacements, num_threads as u64 - 1);
}

#[test]
fn test_sync_concurrent_inserts_respect_limit_and_uniqueness() {
  let recorder = Recorder::new();
  let cache: Arc<Cache<u32, u32>> = Arc::new(
    CacheBuilder::default()
      .initial_size(16)
      .entry_limit(64)
      .no_timeout()
      .shared_eviction_listener(recorder.clone())
      .build()
      .unwrap(),
  );

  let num_threads = 4;
  let ops_per_thread = 2_000u32;
  let barrier = Arc::new(Barrier::new(num_threads));
  let mut handles = vec![];

  for t in 0..num_threads as u32 {
    let cache_clone = cache.clone();
    let barrier_clone = barrier.clone();
    handles.push(thread::spawn(move || {
      barrier_clone.wait();
      for i in 0..ops_per_thread {
        let key = (i * 7 + t) % 200;
        cache_clone.insert(key, i).unwrap();
        assert!(cache_clone.len() <= 64);
      }
    }));
  }

  for handle in handles {
    handle.join().unwrap();
  }

  assert!(cache.len() <= 64);
  // Every key lives in at most one generation.
  let held = (0..200u32).filter(|k| cache.generation_of(k).is_some()).count();
  assert_eq!(held, cache.len());

  let metrics = cache.metrics();
  assert_eq!(metrics.inserts, num_threads as u64 * ops_per_thread as u64);
  assert!(metrics.rotations > 0);
  assert!(!recorder.is_empty());
}

#[test]
fn test_sync_concurrent_lookups_during_rotation() {
  let cache: Arc<Cache<u32, u32>> = Arc::new(
    CacheBuilder::default()
      .entry_limit(1_000)
      .no_timeout()
      .build()
      .unwrap(),
  );
  for i in 0..100 {
    cache.insert(i, i * 10).unwrap();
  }

  let stop = Arc::new(AtomicBool::new(false));
  let rotator = {
    let cache = cache.clone();
    let stop = stop.clone();
    thread::spawn(move || {
      while !stop.load(Ordering::Relaxed) {
        cache.evict_stale_entries();
        thread::yield_now();
      }
    })
  };

  let readers: Vec<_> = (0..4)
    .map(|_| {
      let cache = cache.clone();
      thread::spawn(move || {
        for round in 0..500u32 {
          let key = round % 100;
          // Either gone or still the value that was stored.
          if let Some(value) = cache.get(&key).unwrap() {
            assert_eq!(*value, key * 10);
          }
        }
      })
    })
    .collect();

  for reader in readers {
    reader.join().unwrap();
  }
  stop.store(true, Ordering::Relaxed);
  rotator.join().unwrap();
}
