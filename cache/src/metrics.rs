use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_utils::CachePadded;

/// A monotonically increasing event count, padded to its own cache line.
#[derive(Debug, Default)]
pub(crate) struct Counter(CachePadded<AtomicU64>);

impl Counter {
  #[inline]
  pub(crate) fn add(&self, amount: u64) {
    self.0.fetch_add(amount, Ordering::Relaxed);
  }

  #[inline]
  pub(crate) fn incr(&self) {
    self.add(1);
  }

  #[inline]
  fn get(&self) -> u64 {
    self.0.load(Ordering::Relaxed)
  }
}

/// Operation counters shared by every part of one cache instance.
#[derive(Debug)]
pub(crate) struct Metrics {
  // Lookups
  pub(crate) hits: Counter,
  pub(crate) misses: Counter,

  // Writes and removals
  pub(crate) inserts: Counter,
  pub(crate) replacements: Counter,
  pub(crate) invalidations: Counter,

  // Generational sweeps
  pub(crate) rotations: Counter,
  pub(crate) evicted_by_rotation: Counter,

  started: Instant,
}

impl Metrics {
  pub(crate) fn new() -> Self {
    Self {
      hits: Counter::default(),
      misses: Counter::default(),
      inserts: Counter::default(),
      replacements: Counter::default(),
      invalidations: Counter::default(),
      rotations: Counter::default(),
      evicted_by_rotation: Counter::default(),
      started: Instant::now(),
    }
  }

  pub(crate) fn snapshot(&self) -> MetricsSnapshot {
    let (hits, misses) = (self.hits.get(), self.misses.get());
    let lookups = hits + misses;
    let hit_ratio = match lookups {
      0 => 0.0,
      n => hits as f64 / n as f64,
    };

    MetricsSnapshot {
      hits,
      misses,
      hit_ratio,
      inserts: self.inserts.get(),
      replacements: self.replacements.get(),
      invalidations: self.invalidations.get(),
      rotations: self.rotations.get(),
      evicted_by_rotation: self.evicted_by_rotation.get(),
      uptime_secs: self.started.elapsed().as_secs(),
    }
  }
}

/// Counters read from a cache at one instant.
///
/// In distributed mode only lookups, inserts and invalidations are counted;
/// the provider owns eviction.
#[derive(Clone, PartialEq)]
pub struct MetricsSnapshot {
  /// Lookups that found a resolved value.
  pub hits: u64,
  /// Lookups that found nothing or only a placeholder.
  pub misses: u64,
  /// `hits / (hits + misses)`, or zero before the first lookup.
  pub hit_ratio: f64,
  pub inserts: u64,
  /// Inserts that overwrote a resolved value.
  pub replacements: u64,
  /// Keys removed by `remove` or `clear`.
  pub invalidations: u64,
  /// Generational rotations, timed or pressure-driven.
  pub rotations: u64,
  /// Resolved values discarded by rotations.
  pub evicted_by_rotation: u64,
  pub uptime_secs: u64,
}

impl fmt::Debug for MetricsSnapshot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MetricsSnapshot")
      .field("hits", &self.hits)
      .field("misses", &self.misses)
      .field("hit_ratio", &format_args!("{:.2}%", self.hit_ratio * 100.0))
      .field("inserts", &self.inserts)
      .field("replacements", &self.replacements)
      .field("invalidations", &self.invalidations)
      .field("rotations", &self.rotations)
      .field("evicted_by_rotation", &self.evicted_by_rotation)
      .field("uptime_secs", &self.uptime_secs)
      .finish()
  }
}
