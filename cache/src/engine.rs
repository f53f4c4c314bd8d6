use crate::entry::Entry;
use crate::generations::{resolved_values, Generation, Generations};
use crate::listener::{EvictionReason, Listeners};
use crate::metrics::Metrics;

use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

/// Batches of evicted values collected inside the engine's critical section
/// and delivered to listeners after it is released.
#[must_use = "evicted values must be delivered to the listeners"]
pub(crate) struct Evicted<V> {
  batches: Vec<(Vec<Arc<V>>, EvictionReason)>,
}

impl<V> Evicted<V> {
  #[inline]
  pub(crate) fn none() -> Self {
    Self { batches: Vec::new() }
  }

  fn push(&mut self, values: Vec<Arc<V>>, reason: EvictionReason) {
    if !values.is_empty() {
      self.batches.push((values, reason));
    }
  }

  /// Hands every collected batch to the listeners, in eviction order.
  pub(crate) fn deliver(self, listeners: &Listeners<V>) {
    for (values, reason) in self.batches {
      listeners.notify(&values, reason);
    }
  }
}

/// The local, three-generation approximate-LRU engine.
///
/// All table access goes through one mutex, so lookups, inserts, removals
/// and rotations never interleave.
pub(crate) struct LocalEngine<K, V, H> {
  generations: Mutex<Generations<K, V, H>>,
  entry_limit: usize,
  metrics: Arc<Metrics>,
}

impl<K, V, H> fmt::Debug for LocalEngine<K, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("LocalEngine")
      .field("entry_limit", &self.entry_limit)
      .finish_non_exhaustive()
  }
}

impl<K, V, H> LocalEngine<K, V, H>
where
  K: Eq + Hash + Clone,
  H: BuildHasher + Clone,
{
  pub(crate) fn new(min_size: usize, entry_limit: usize, hasher: H, metrics: Arc<Metrics>) -> Self {
    Self {
      generations: Mutex::new(Generations::new(min_size, hasher)),
      entry_limit,
      metrics,
    }
  }

  /// Whether a finite, positive entry limit is configured.
  #[inline]
  fn is_bounded(&self) -> bool {
    self.entry_limit != 0 && self.entry_limit != usize::MAX
  }

  /// Finds the entry for `key`, reserving a placeholder on a miss.
  pub(crate) fn lookup(&self, key: &K) -> Arc<Entry<V>> {
    let (entry, _found) = self.generations.lock().lookup(key);
    if entry.is_placeholder() {
      self.metrics.misses.incr();
    } else {
      self.metrics.hits.incr();
    }
    entry
  }

  /// Stores `value` under `key`, first rotating generations until the
  /// insert cannot push the cache past its entry limit.
  pub(crate) fn insert(&self, key: K, value: Arc<V>) -> Evicted<V> {
    let mut evicted = Evicted::none();
    let mut generations = self.generations.lock();

    while self.is_bounded() && self.projected_len(&generations, &key) > self.entry_limit {
      let victims = self.rotate(&mut generations);
      evicted.push(victims, EvictionReason::Capacity);
    }

    let previous = generations.insert(key, Arc::new(Entry::resolved(value)));
    drop(generations);

    self.metrics.inserts.incr();
    if let Some(old) = previous.and_then(|entry| entry.value()) {
      self.metrics.replacements.incr();
      evicted.push(vec![old], EvictionReason::Replaced);
    }
    evicted
  }

  /// The cache size after inserting `key`, which only grows the cache when
  /// the key is not already held in some generation.
  fn projected_len(&self, generations: &Generations<K, V, H>, key: &K) -> usize {
    let absent = generations.generation_of(key).is_none();
    generations.len() + usize::from(absent)
  }

  /// Deletes `key` from every generation.
  ///
  /// Returns whether the key was present, plus the removed value when
  /// `report` is set and the entry was resolved.
  pub(crate) fn remove(&self, key: &K, report: bool) -> (bool, Evicted<V>) {
    let removed = self.generations.lock().remove(key);
    let mut evicted = Evicted::none();

    let Some(entry) = removed else {
      return (false, evicted);
    };
    self.metrics.invalidations.incr();
    if report {
      if let Some(value) = entry.value() {
        evicted.push(vec![value], EvictionReason::Invalidated);
      }
    }
    (true, evicted)
  }

  /// Runs one generational rotation and returns the condemned values.
  pub(crate) fn evict_stale_entries(&self, reason: EvictionReason) -> Evicted<V> {
    let mut evicted = Evicted::none();
    let victims = self.rotate(&mut self.generations.lock());
    evicted.push(victims, reason);
    evicted
  }

  fn rotate(&self, generations: &mut Generations<K, V, H>) -> Vec<Arc<V>> {
    let (primary, secondary, tertiary) = generations.sizes();
    debug!(
      size = primary + secondary + tertiary,
      primary, secondary, tertiary, "Rotating cache generations"
    );

    let victims = resolved_values(generations.rotate().into_values());
    self.metrics.rotations.incr();
    self.metrics.evicted_by_rotation.add(victims.len() as u64);
    victims
  }

  /// Empties every generation, treating the whole cache as invalidated.
  pub(crate) fn clear(&self) -> Evicted<V> {
    let drained = self.generations.lock().drain_all();
    self.metrics.invalidations.add(drained.len() as u64);

    let mut evicted = Evicted::none();
    evicted.push(resolved_values(drained), EvictionReason::Invalidated);
    evicted
  }

  /// Whether the cache currently holds more keys than its entry limit.
  pub(crate) fn is_eviction_required(&self) -> bool {
    let generations = self.generations.lock();
    let (primary, secondary, tertiary) = generations.sizes();
    let size = primary + secondary + tertiary;
    debug!(size, primary, secondary, tertiary, "Current cache size");

    if self.is_bounded() && size > self.entry_limit {
      debug!(
        size,
        entry_limit = self.entry_limit,
        "Cache size is greater than the cache limit"
      );
      return true;
    }
    false
  }

  pub(crate) fn len(&self) -> usize {
    self.generations.lock().len()
  }

  pub(crate) fn generation_of(&self, key: &K) -> Option<Generation> {
    self.generations.lock().generation_of(key)
  }

  pub(crate) fn generation_len(&self, generation: Generation) -> usize {
    self.generations.lock().generation_len(generation)
  }
}
