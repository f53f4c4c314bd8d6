use crate::entry::Entry;

use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::mem;
use std::sync::Arc;

/// One of the three recency tiers a key can live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Generation {
  /// Recently used entries.
  Primary,
  /// Entries not touched since the last rotation.
  Secondary,
  /// Entries not touched for two rotations; the next rotation evicts them.
  Tertiary,
}

type Table<K, V, H> = HashMap<K, Arc<Entry<V>>, H>;

/// The three generation tables of the local engine.
///
/// Every method preserves the invariant that a key lives in at most one
/// table. Callers serialize access through a single lock, so a rotation is
/// never observed half-done.
pub(crate) struct Generations<K, V, H> {
  primary: Table<K, V, H>,
  secondary: Table<K, V, H>,
  tertiary: Table<K, V, H>,
  min_size: usize,
  hasher: H,
}

impl<K, V, H> fmt::Debug for Generations<K, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Generations")
      .field("primary", &self.primary.len())
      .field("secondary", &self.secondary.len())
      .field("tertiary", &self.tertiary.len())
      .field("min_size", &self.min_size)
      .finish()
  }
}

impl<K, V, H> Generations<K, V, H>
where
  K: Eq + Hash,
  H: BuildHasher + Clone,
{
  pub(crate) fn new(min_size: usize, hasher: H) -> Self {
    Self {
      primary: HashMap::with_capacity_and_hasher(min_size, hasher.clone()),
      secondary: HashMap::with_capacity_and_hasher(min_size, hasher.clone()),
      tertiary: HashMap::with_capacity_and_hasher(min_size, hasher.clone()),
      min_size,
      hasher,
    }
  }

  /// Total number of keys across all three generations.
  #[inline]
  pub(crate) fn len(&self) -> usize {
    self.primary.len() + self.secondary.len() + self.tertiary.len()
  }

  #[inline]
  pub(crate) fn sizes(&self) -> (usize, usize, usize) {
    (self.primary.len(), self.secondary.len(), self.tertiary.len())
  }

  pub(crate) fn generation_len(&self, generation: Generation) -> usize {
    match generation {
      Generation::Primary => self.primary.len(),
      Generation::Secondary => self.secondary.len(),
      Generation::Tertiary => self.tertiary.len(),
    }
  }

  pub(crate) fn generation_of(&self, key: &K) -> Option<Generation> {
    if self.primary.contains_key(key) {
      Some(Generation::Primary)
    } else if self.secondary.contains_key(key) {
      Some(Generation::Secondary)
    } else if self.tertiary.contains_key(key) {
      Some(Generation::Tertiary)
    } else {
      None
    }
  }

  /// Finds the entry for `key`, promoting it into the primary generation.
  ///
  /// An entry found in the secondary or tertiary table is moved, not
  /// copied, so the key stays in exactly one table. On a complete miss a
  /// placeholder is reserved in the primary table and returned. The second
  /// value reports whether the key was found at all.
  pub(crate) fn lookup(&mut self, key: &K) -> (Arc<Entry<V>>, bool)
  where
    K: Clone,
  {
    if let Some(entry) = self.primary.get(key) {
      return (entry.clone(), true);
    }

    let demoted = self
      .secondary
      .remove(key)
      .or_else(|| self.tertiary.remove(key));

    match demoted {
      Some(entry) => {
        self.primary.insert(key.clone(), entry.clone());
        (entry, true)
      }
      None => {
        let entry = self
          .primary
          .entry(key.clone())
          .or_insert_with(|| Arc::new(Entry::placeholder()));
        (entry.clone(), false)
      }
    }
  }

  /// Installs `entry` in the primary generation, returning whatever entry
  /// previously held the key in any generation.
  pub(crate) fn insert(&mut self, key: K, entry: Arc<Entry<V>>) -> Option<Arc<Entry<V>>> {
    let demoted = self
      .secondary
      .remove(&key)
      .or_else(|| self.tertiary.remove(&key));
    let previous = self.primary.insert(key, entry);
    previous.or(demoted)
  }

  /// Deletes `key` from every generation, returning the entry that held it.
  pub(crate) fn remove(&mut self, key: &K) -> Option<Arc<Entry<V>>> {
    self
      .primary
      .remove(key)
      .or_else(|| self.secondary.remove(key))
      .or_else(|| self.tertiary.remove(key))
  }

  /// Shifts every generation down one tier and returns the condemned table.
  ///
  /// The old tertiary table is the victim set, the secondary becomes the
  /// tertiary, the primary becomes the secondary, and a fresh primary is
  /// sized to the larger of the minimum size and the new secondary.
  pub(crate) fn rotate(&mut self) -> Table<K, V, H> {
    let capacity = self.min_size.max(self.primary.len());
    let fresh = HashMap::with_capacity_and_hasher(capacity, self.hasher.clone());
    let demoted_primary = mem::replace(&mut self.primary, fresh);
    let demoted_secondary = mem::replace(&mut self.secondary, demoted_primary);
    mem::replace(&mut self.tertiary, demoted_secondary)
  }

  /// Empties all three generations, returning their entries.
  pub(crate) fn drain_all(&mut self) -> Vec<Arc<Entry<V>>> {
    let mut drained = Vec::with_capacity(self.len());
    drained.extend(self.primary.drain().map(|(_, entry)| entry));
    drained.extend(self.secondary.drain().map(|(_, entry)| entry));
    drained.extend(self.tertiary.drain().map(|(_, entry)| entry));
    drained
  }
}

/// Collects the resolved values from a set of evicted entries, skipping placeholders.
pub(crate) fn resolved_values<V, I>(entries: I) -> Vec<Arc<V>>
where
  I: IntoIterator<Item = Arc<Entry<V>>>,
{
  entries.into_iter().filter_map(|entry| entry.value()).collect()
}
