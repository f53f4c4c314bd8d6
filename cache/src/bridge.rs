use crate::entry::Entry;
use crate::error::Result;
use crate::listener::{EvictionReason, Listeners};
use crate::metrics::Metrics;
use crate::provider::{CacheEntryEvent, CacheEntryListener, CacheProvider, ProviderSource};
use crate::serializer::{decode, encode, ValueSerializer};

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info};

/// Routes cache operations to an external provider.
///
/// Values cross the boundary as bytes produced by the configured
/// serializer. The provider owns sizing and eviction; its removal and
/// expiry events come back through [`EventAdapter`] as ordinary listener
/// batches.
pub(crate) struct Bridge<K, V> {
  source: Box<dyn ProviderSource<K>>,
  provider: Mutex<Option<Arc<dyn CacheProvider<K>>>>,
  opening: Mutex<()>,
  serializer: Arc<dyn ValueSerializer<V>>,
  listeners: Arc<Listeners<V>>,
  metrics: Arc<Metrics>,
}

impl<K, V> fmt::Debug for Bridge<K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Bridge")
      .field("connected", &self.provider.lock().is_some())
      .field("listeners", &self.listeners.len())
      .finish_non_exhaustive()
  }
}

impl<K, V> Bridge<K, V>
where
  K: Send + Sync + 'static,
  V: Send + Sync + 'static,
{
  pub(crate) fn new(
    source: Box<dyn ProviderSource<K>>,
    serializer: Arc<dyn ValueSerializer<V>>,
    listeners: Arc<Listeners<V>>,
    metrics: Arc<Metrics>,
  ) -> Self {
    Self {
      source,
      provider: Mutex::new(None),
      opening: Mutex::new(()),
      serializer,
      listeners,
      metrics,
    }
  }

  /// Returns the provider handle, opening it and registering the event
  /// adapter on first use.
  ///
  /// The handle slot is only locked to read or publish the handle. Opens
  /// are serialized on their own lock, and the handle is published before
  /// the adapter is registered, so events a provider delivers inline during
  /// registration may call back into the cache.
  fn provider(&self) -> Result<Arc<dyn CacheProvider<K>>> {
    if let Some(provider) = self.current() {
      return Ok(provider);
    }

    let _opening = self.opening.lock();
    // Another thread may have opened it while this one waited.
    if let Some(provider) = self.current() {
      return Ok(provider);
    }

    let provider = self.source.open().map_err(|err| {
      error!(error = %err, "Unable to open the cache provider");
      err
    })?;
    *self.provider.lock() = Some(provider.clone());

    let adapter = EventAdapter {
      serializer: self.serializer.clone(),
      listeners: self.listeners.clone(),
    };
    if let Err(err) = provider.register_listener(Arc::new(adapter)) {
      error!(error = %err, "Unable to register the eviction event adapter");
      *self.provider.lock() = None;
      return Err(err);
    }
    info!(
      listeners = self.listeners.len(),
      "Opened cache provider and registered eviction event adapter"
    );
    Ok(provider)
  }

  fn current(&self) -> Option<Arc<dyn CacheProvider<K>>> {
    self.provider.lock().clone()
  }

  pub(crate) fn lookup(&self, key: &K) -> Result<Arc<Entry<V>>> {
    let provider = self.provider()?;
    let bytes = provider.get(key)?;
    debug!(hit = bytes.is_some(), "Distributed cache lookup");

    match decode(&*self.serializer, bytes.as_deref()) {
      Some(value) => {
        self.metrics.hits.incr();
        Ok(Arc::new(Entry::resolved(Arc::new(value))))
      }
      None => {
        self.metrics.misses.incr();
        Ok(Arc::new(Entry::placeholder()))
      }
    }
  }

  /// Serializes and stores `value`. A value that fails to serialize is
  /// dropped; the caller recomputes it on the next miss.
  pub(crate) fn insert(&self, key: K, value: &V) -> Result<()> {
    let provider = self.provider()?;
    let Some(bytes) = encode(&*self.serializer, Some(value)) else {
      debug!("Dropping cache write for a value that could not be serialized");
      return Ok(());
    };
    provider.put(key, bytes)?;
    self.metrics.inserts.incr();
    Ok(())
  }

  pub(crate) fn remove(&self, key: &K) -> Result<bool> {
    let removed = self.provider()?.remove(key)?;
    if removed {
      self.metrics.invalidations.incr();
    }
    Ok(removed)
  }

  pub(crate) fn clear(&self) -> Result<()> {
    self.provider()?.remove_all()
  }

  pub(crate) fn is_connected(&self) -> bool {
    self.current().is_some()
  }
}

/// Translates provider entry events into eviction listener batches.
///
/// Removed and expired events become one batch per provider batch.
/// Created and updated events are only logged.
pub(crate) struct EventAdapter<V> {
  serializer: Arc<dyn ValueSerializer<V>>,
  listeners: Arc<Listeners<V>>,
}

impl<V> EventAdapter<V> {
  fn forward<K>(&self, events: &[CacheEntryEvent<K>], reason: EvictionReason) {
    // Skip deserializing when nobody is listening.
    if self.listeners.is_empty() {
      return;
    }

    let victims: Vec<Arc<V>> = events
      .iter()
      .filter_map(|event| decode(&*self.serializer, event.value.as_deref()))
      .map(Arc::new)
      .collect();

    self.listeners.notify(&victims, reason);
  }
}

impl<K, V> CacheEntryListener<K> for EventAdapter<V>
where
  V: Send + Sync,
{
  fn on_created(&self, events: &[CacheEntryEvent<K>]) {
    debug!(count = events.len(), "Cache provider entries created");
  }

  fn on_updated(&self, events: &[CacheEntryEvent<K>]) {
    debug!(count = events.len(), "Cache provider entries updated");
  }

  fn on_removed(&self, events: &[CacheEntryEvent<K>]) {
    self.forward(events, EvictionReason::Invalidated);
  }

  fn on_expired(&self, events: &[CacheEntryEvent<K>]) {
    self.forward(events, EvictionReason::Expired);
  }
}
