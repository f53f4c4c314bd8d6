//! The boundary to an external, distributed cache provider.
//!
//! A provider stores opaque bytes under the cache's keys, owns sizing and
//! eviction, and reports entry changes to registered
//! [`CacheEntryListener`]s in batches.

use crate::error::Result;

use std::sync::Arc;

/// A single entry change reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntryEvent<K> {
  pub key: K,
  /// The entry's stored bytes. Providers that do not carry the value with
  /// the event leave this empty, and such events are skipped.
  pub value: Option<Vec<u8>>,
}

impl<K> CacheEntryEvent<K> {
  pub fn new(key: K, value: Option<Vec<u8>>) -> Self {
    Self { key, value }
  }
}

/// Receives batches of entry events from a provider.
///
/// Every method defaults to ignoring its batch.
pub trait CacheEntryListener<K>: Send + Sync {
  fn on_created(&self, _events: &[CacheEntryEvent<K>]) {}

  fn on_updated(&self, _events: &[CacheEntryEvent<K>]) {}

  fn on_removed(&self, _events: &[CacheEntryEvent<K>]) {}

  fn on_expired(&self, _events: &[CacheEntryEvent<K>]) {}
}

/// A live handle to an external cache.
///
/// Calls may block on network round-trips; the cache never holds its own
/// locks while calling into a provider.
pub trait CacheProvider<K>: Send + Sync {
  fn get(&self, key: &K) -> Result<Option<Vec<u8>>>;

  fn put(&self, key: K, value: Vec<u8>) -> Result<()>;

  /// Removes `key`, returning whether it was present.
  fn remove(&self, key: &K) -> Result<bool>;

  /// Removes every entry. Providers report the removals to their listeners.
  fn remove_all(&self) -> Result<()>;

  /// Subscribes `listener` to entry events. A provider may deliver events
  /// to it before this returns.
  fn register_listener(&self, listener: Arc<dyn CacheEntryListener<K>>) -> Result<()>;
}

/// Opens the provider handle on first use.
///
/// A failed open is returned to the cache operation that needed the
/// handle; the next operation tries again. A successful handle is kept for
/// the life of the cache. `open` must not call back into the cache that
/// owns this source.
pub trait ProviderSource<K>: Send + Sync {
  fn open(&self) -> Result<Arc<dyn CacheProvider<K>>>;
}

impl<K, F> ProviderSource<K> for F
where
  F: Fn() -> Result<Arc<dyn CacheProvider<K>>> + Send + Sync,
{
  fn open(&self) -> Result<Arc<dyn CacheProvider<K>>> {
    self()
  }
}
