#![allow(dead_code)]

use fibre_authcache::{
  CacheEntryEvent, CacheEntryListener, CacheError, CacheProvider, EvictionListener,
  EvictionReason, Result,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Routes `tracing` output to the test harness. Set `RUST_LOG` to see it.
pub fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
}

pub fn strings(values: &[&str]) -> Vec<String> {
  values.iter().map(|v| v.to_string()).collect()
}

/// Records every batch a cache delivers, in order.
pub struct Recorder<V> {
  batches: Mutex<Vec<(Vec<V>, EvictionReason)>>,
}

impl<V: Clone> Recorder<V> {
  pub fn new() -> Arc<Self> {
    Arc::new(Self {
      batches: Mutex::new(Vec::new()),
    })
  }

  pub fn batches(&self) -> Vec<(Vec<V>, EvictionReason)> {
    self.batches.lock().clone()
  }

  /// Every recorded value, flattened and sorted.
  pub fn values_sorted(&self) -> Vec<V>
  where
    V: Ord,
  {
    let mut values: Vec<V> = self
      .batches
      .lock()
      .iter()
      .flat_map(|(values, _)| values.iter().cloned())
      .collect();
    values.sort();
    values
  }

  pub fn is_empty(&self) -> bool {
    self.batches.lock().is_empty()
  }
}

impl<V: Clone + Send + Sync> EvictionListener<V> for Recorder<V> {
  fn evicted(&self, values: &[Arc<V>], reason: EvictionReason) {
    let values = values.iter().map(|v| (**v).clone()).collect();
    self.batches.lock().push((values, reason));
  }
}

/// An in-process stand-in for a distributed cache provider.
///
/// Events are delivered synchronously on the calling thread, one batch per
/// operation, the way a single-node provider would.
pub struct MemoryProvider<K> {
  entries: Mutex<HashMap<K, Vec<u8>>>,
  listeners: Mutex<Vec<Arc<dyn CacheEntryListener<K>>>>,
  replay_on_register: bool,
  pub registrations: AtomicUsize,
}

impl<K: Eq + Hash + Clone + Send + Sync> MemoryProvider<K> {
  pub fn new() -> Arc<Self> {
    Self::with_replay(false)
  }

  /// A provider that replays its current entries to each new listener as
  /// one removal batch, inline, before `register_listener` returns.
  pub fn replaying() -> Arc<Self> {
    Self::with_replay(true)
  }

  fn with_replay(replay_on_register: bool) -> Arc<Self> {
    Arc::new(Self {
      entries: Mutex::new(HashMap::new()),
      listeners: Mutex::new(Vec::new()),
      replay_on_register,
      registrations: AtomicUsize::new(0),
    })
  }

  pub fn len(&self) -> usize {
    self.entries.lock().len()
  }

  pub fn raw(&self, key: &K) -> Option<Vec<u8>> {
    self.entries.lock().get(key).cloned()
  }

  /// Stores bytes directly, bypassing any serializer.
  pub fn put_raw(&self, key: K, value: Vec<u8>) {
    self.entries.lock().insert(key, value);
  }

  /// Expires the given keys as one provider batch.
  pub fn expire(&self, keys: &[K]) {
    let events: Vec<CacheEntryEvent<K>> = {
      let mut entries = self.entries.lock();
      keys
        .iter()
        .filter_map(|key| {
          entries
            .remove(key)
            .map(|value| CacheEntryEvent::new(key.clone(), Some(value)))
        })
        .collect()
    };
    self.each_listener(|listener| listener.on_expired(&events));
  }

  /// Delivers a removal batch as-is, e.g. with value-less events.
  pub fn emit_removed(&self, events: Vec<CacheEntryEvent<K>>) {
    self.each_listener(|listener| listener.on_removed(&events));
  }

  fn each_listener(&self, f: impl Fn(&Arc<dyn CacheEntryListener<K>>)) {
    let listeners = self.listeners.lock().clone();
    for listener in &listeners {
      f(listener);
    }
  }
}

impl<K: Eq + Hash + Clone + Send + Sync> CacheProvider<K> for MemoryProvider<K> {
  fn get(&self, key: &K) -> Result<Option<Vec<u8>>> {
    Ok(self.entries.lock().get(key).cloned())
  }

  fn put(&self, key: K, value: Vec<u8>) -> Result<()> {
    let previous = self.entries.lock().insert(key.clone(), value.clone());
    let events = [CacheEntryEvent::new(key, Some(value))];
    if previous.is_some() {
      self.each_listener(|listener| listener.on_updated(&events));
    } else {
      self.each_listener(|listener| listener.on_created(&events));
    }
    Ok(())
  }

  fn remove(&self, key: &K) -> Result<bool> {
    let removed = self.entries.lock().remove(key);
    match removed {
      Some(value) => {
        self.emit_removed(vec![CacheEntryEvent::new(key.clone(), Some(value))]);
        Ok(true)
      }
      None => Ok(false),
    }
  }

  fn remove_all(&self) -> Result<()> {
    let events: Vec<CacheEntryEvent<K>> = self
      .entries
      .lock()
      .drain()
      .map(|(key, value)| CacheEntryEvent::new(key, Some(value)))
      .collect();
    if !events.is_empty() {
      self.emit_removed(events);
    }
    Ok(())
  }

  fn register_listener(&self, listener: Arc<dyn CacheEntryListener<K>>) -> Result<()> {
    self.registrations.fetch_add(1, Ordering::SeqCst);
    self.listeners.lock().push(listener.clone());

    if self.replay_on_register {
      let events: Vec<CacheEntryEvent<K>> = self
        .entries
        .lock()
        .iter()
        .map(|(key, value)| CacheEntryEvent::new(key.clone(), Some(value.clone())))
        .collect();
      if !events.is_empty() {
        listener.on_removed(&events);
      }
    }
    Ok(())
  }
}

/// A provider whose every call fails.
pub struct FailingProvider;

impl<K> CacheProvider<K> for FailingProvider {
  fn get(&self, _key: &K) -> Result<Option<Vec<u8>>> {
    Err(CacheError::Provider("connection reset".to_string()))
  }

  fn put(&self, _key: K, _value: Vec<u8>) -> Result<()> {
    Err(CacheError::Provider("connection reset".to_string()))
  }

  fn remove(&self, _key: &K) -> Result<bool> {
    Err(CacheError::Provider("connection reset".to_string()))
  }

  fn remove_all(&self) -> Result<()> {
    Err(CacheError::Provider("connection reset".to_string()))
  }

  fn register_listener(&self, _listener: Arc<dyn CacheEntryListener<K>>) -> Result<()> {
    Ok(())
  }
}
