use crate::entry::Entry;
use crate::error::Result;
use crate::generations::Generation;
use crate::shared::{Backend, CacheShared};
use crate::MetricsSnapshot;

use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

/// A thread-safe authentication-result cache.
///
/// Callers look a key up with [`get`](Cache::get) and, on a miss, compute
/// the value and [`insert`](Cache::insert) it. A local cache keeps entries
/// in three generations that rotate on a timer and under entry-limit
/// pressure; a distributed cache hands every operation to an external
/// provider. Eviction listeners see the same batches in both modes.
///
/// Operations only fail in distributed mode, when the provider cannot be
/// opened or a provider call fails.
#[derive(Debug)]
pub struct Cache<K, V, H = ahash::RandomState> {
  pub(crate) shared: Arc<CacheShared<K, V, H>>,
}

impl<K, V, H> Cache<K, V, H>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  H: BuildHasher + Clone + Send + Sync + 'static,
{
  /// Returns the value cached under `key`, or `None` on a miss.
  ///
  /// In local mode a hit in an older generation promotes the entry back to
  /// the primary generation, and a miss reserves a placeholder entry.
  pub fn get(&self, key: &K) -> Result<Option<Arc<V>>> {
    Ok(self.lookup(key)?.value())
  }

  /// Returns the entry for `key`, which is a placeholder on a miss.
  ///
  /// In local mode, concurrent lookups of the same absent key all receive
  /// the same placeholder entry.
  pub fn lookup(&self, key: &K) -> Result<Arc<Entry<V>>> {
    match &self.shared.backend {
      Backend::Local(engine) => Ok(engine.lookup(key)),
      Backend::Distributed(bridge) => bridge.lookup(key),
    }
  }

  /// Stores `value` under `key`, replacing any previous value.
  ///
  /// A replaced value is reported to the listeners as a single-value batch.
  /// In local mode, an insert that would push the cache past its entry
  /// limit first rotates generations until it fits.
  pub fn insert(&self, key: K, value: V) -> Result<()> {
    match &self.shared.backend {
      Backend::Local(engine) => {
        engine
          .insert(key, Arc::new(value))
          .deliver(&self.shared.listeners);
        Ok(())
      }
      Backend::Distributed(bridge) => bridge.insert(key, &value),
    }
  }

  /// Removes `key`, returning whether it was present.
  ///
  /// The removed value is reported to the listeners, if any are registered.
  pub fn remove(&self, key: &K) -> Result<bool> {
    match &self.shared.backend {
      Backend::Local(engine) => {
        let report = !self.shared.listeners.is_empty();
        let (removed, evicted) = engine.remove(key, report);
        evicted.deliver(&self.shared.listeners);
        Ok(removed)
      }
      Backend::Distributed(bridge) => bridge.remove(key),
    }
  }

  /// Removes every entry, reporting all values as one invalidated batch.
  pub fn clear(&self) -> Result<()> {
    match &self.shared.backend {
      Backend::Local(engine) => {
        engine.clear().deliver(&self.shared.listeners);
        Ok(())
      }
      Backend::Distributed(bridge) => bridge.clear(),
    }
  }

  /// Rotates the local generations once, as the eviction scheduler does.
  ///
  /// Values in the tertiary generation are reported as expired. Does
  /// nothing in distributed mode.
  pub fn evict_stale_entries(&self) {
    self.shared.evict_stale_entries();
  }

  /// Whether the local cache holds more keys than its entry limit.
  /// Always `false` in distributed mode.
  pub fn is_eviction_required(&self) -> bool {
    match &self.shared.backend {
      Backend::Local(engine) => engine.is_eviction_required(),
      Backend::Distributed(_) => false,
    }
  }

  /// Cancels the eviction scheduler. Dropping the cache does the same.
  pub fn stop_eviction_task(&self) {
    self.shared.stop_janitor();
  }

  /// Whether the eviction scheduler is running.
  pub fn has_eviction_task(&self) -> bool {
    self.shared.janitor.lock().is_some()
  }

  pub fn is_distributed(&self) -> bool {
    matches!(self.shared.backend, Backend::Distributed(_))
  }

  /// Whether a distributed cache has opened its provider. Always `false`
  /// in local mode.
  pub fn is_connected(&self) -> bool {
    match &self.shared.backend {
      Backend::Local(_) => false,
      Backend::Distributed(bridge) => bridge.is_connected(),
    }
  }

  /// Number of keys held locally, placeholders included. Zero in
  /// distributed mode.
  pub fn len(&self) -> usize {
    match &self.shared.backend {
      Backend::Local(engine) => engine.len(),
      Backend::Distributed(_) => 0,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// The generation currently holding `key`, without promoting it.
  pub fn generation_of(&self, key: &K) -> Option<Generation> {
    match &self.shared.backend {
      Backend::Local(engine) => engine.generation_of(key),
      Backend::Distributed(_) => None,
    }
  }

  pub fn generation_len(&self, generation: Generation) -> usize {
    match &self.shared.backend {
      Backend::Local(engine) => engine.generation_len(generation),
      Backend::Distributed(_) => 0,
    }
  }

  pub fn metrics(&self) -> MetricsSnapshot {
    self.shared.metrics.snapshot()
  }
}
