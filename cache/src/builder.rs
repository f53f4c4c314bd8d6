use crate::bridge::Bridge;
use crate::engine::LocalEngine;
use crate::error::BuildError;
use crate::handles::Cache;
use crate::listener::{EvictionListener, Listeners};
use crate::metrics::Metrics;
use crate::provider::ProviderSource;
use crate::serializer::ValueSerializer;
use crate::shared::{Backend, CacheShared};

use core::fmt;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

/// Default initial size of each generation table.
pub const DEFAULT_INITIAL_SIZE: usize = 50;
/// Default maximum number of entries across all generations.
pub const DEFAULT_ENTRY_LIMIT: usize = 25_000;
/// Default timeout; generations rotate every half timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Externally supplied cache settings, e.g. read from a server config file.
///
/// With the `serde` feature it deserializes from `initialSize`, `maxSize`
/// and a human-readable `timeout` such as `"10m"` or `"90s"`. Missing
/// fields take the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
  feature = "serde",
  derive(serde::Serialize, serde::Deserialize),
  serde(rename_all = "camelCase", default)
)]
pub struct CacheConfig {
  pub initial_size: usize,
  pub max_size: usize,
  pub timeout: String,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      initial_size: DEFAULT_INITIAL_SIZE,
      max_size: DEFAULT_ENTRY_LIMIT,
      timeout: humantime::format_duration(DEFAULT_TIMEOUT).to_string(),
    }
  }
}

/// A builder for creating `Cache` instances.
pub struct CacheBuilder<K, V, H = ahash::RandomState> {
  initial_size: usize,
  entry_limit: usize,
  timeout: Option<Duration>,
  hasher: H,
  listeners: Vec<Arc<dyn EvictionListener<V>>>,
  _key_marker: PhantomData<K>,
}

impl<K, V, H> fmt::Debug for CacheBuilder<K, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheBuilder")
      .field("initial_size", &self.initial_size)
      .field("entry_limit", &self.entry_limit)
      .field("timeout", &self.timeout)
      .field("listeners", &self.listeners.len())
      .finish_non_exhaustive()
  }
}

// --- General Configuration Methods ---
impl<K, V, H> CacheBuilder<K, V, H> {
  /// Sets the initial capacity of each generation table. A fresh primary
  /// table is never sized below this. It is only a sizing hint: with a
  /// finite entry limit below it, the limit is used instead.
  pub fn initial_size(mut self, initial_size: usize) -> Self {
    self.initial_size = initial_size;
    self
  }

  /// Sets the maximum number of keys across all generations.
  ///
  /// `0` or `usize::MAX` disables limit-based eviction.
  pub fn entry_limit(mut self, entry_limit: usize) -> Self {
    self.entry_limit = entry_limit;
    self
  }

  /// Disables limit-based eviction.
  pub fn unbounded(mut self) -> Self {
    self.entry_limit = usize::MAX;
    self
  }

  /// Sets the timeout driving the eviction scheduler. Generations rotate
  /// every half timeout, so an untouched entry survives at least one full
  /// timeout. A zero timeout disables the scheduler.
  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.timeout = (!timeout.is_zero()).then_some(timeout);
    self
  }

  /// Disables the eviction scheduler.
  pub fn no_timeout(mut self) -> Self {
    self.timeout = None;
    self
  }

  /// Registers an eviction listener. Listeners are called in registration order.
  pub fn eviction_listener<Listener>(mut self, listener: Listener) -> Self
  where
    Listener: EvictionListener<V> + 'static,
  {
    self.listeners.push(Arc::new(listener));
    self
  }

  /// Registers an already shared eviction listener.
  pub fn shared_eviction_listener(mut self, listener: Arc<dyn EvictionListener<V>>) -> Self {
    self.listeners.push(listener);
    self
  }

  /// Sets the hasher for the generation tables.
  pub fn hasher(mut self, hasher: H) -> Self {
    self.hasher = hasher;
    self
  }

  /// Applies the settings from a `CacheConfig`.
  pub fn config(mut self, config: &CacheConfig) -> Result<Self, BuildError> {
    let timeout = humantime::parse_duration(config.timeout.trim()).map_err(|e| {
      BuildError::InvalidTimeout {
        value: config.timeout.clone(),
        reason: e.to_string(),
      }
    })?;
    self.initial_size = config.initial_size;
    self.entry_limit = config.max_size;
    Ok(self.timeout(timeout))
  }
}

// --- Default Constructor ---
impl<K, V, H: BuildHasher + Default> CacheBuilder<K, V, H> {
  /// Creates a new `CacheBuilder` with default settings.
  pub fn new() -> Self {
    Self {
      initial_size: DEFAULT_INITIAL_SIZE,
      entry_limit: DEFAULT_ENTRY_LIMIT,
      timeout: Some(DEFAULT_TIMEOUT),
      hasher: H::default(),
      listeners: Vec::new(),
      _key_marker: PhantomData,
    }
  }

  /// Creates a builder from a `CacheConfig`.
  pub fn from_config(config: &CacheConfig) -> Result<Self, BuildError> {
    Self::new().config(config)
  }
}

impl<K, V> Default for CacheBuilder<K, V, ahash::RandomState> {
  fn default() -> Self {
    Self::new()
  }
}

// --- Build Methods ---
impl<K, V, H> CacheBuilder<K, V, H>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  H: BuildHasher + Clone + Send + Sync + 'static,
{
  /// Builds a local cache backed by the generational tables, starting the
  /// eviction scheduler when a timeout is set.
  pub fn build(self) -> Result<Cache<K, V, H>, BuildError> {
    let metrics = Arc::new(Metrics::new());
    let engine = LocalEngine::new(
      self.table_size_hint(),
      self.entry_limit,
      self.hasher,
      Arc::clone(&metrics),
    );

    let shared = Arc::new(CacheShared {
      backend: Backend::Local(engine),
      listeners: Arc::new(Listeners::new(self.listeners)),
      metrics,
      janitor: Mutex::new(None),
    });

    if let Some(timeout) = self.timeout {
      CacheShared::start_janitor(&shared, timeout)
        .map_err(|e| BuildError::SchedulerSpawn(e.to_string()))?;
    }

    Ok(Cache { shared })
  }

  /// Builds a cache that delegates storage and eviction to an external
  /// provider. Entry limit and timeout do not apply; the provider is
  /// opened on the first operation.
  pub fn build_distributed<S, Ser>(self, source: S, serializer: Ser) -> Result<Cache<K, V, H>, BuildError>
  where
    S: ProviderSource<K> + 'static,
    Ser: ValueSerializer<V> + 'static,
  {
    let metrics = Arc::new(Metrics::new());
    let listeners = Arc::new(Listeners::new(self.listeners));
    let bridge = Bridge::new(
      Box::new(source),
      Arc::new(serializer),
      Arc::clone(&listeners),
      Arc::clone(&metrics),
    );

    Ok(Cache {
      shared: Arc::new(CacheShared {
        backend: Backend::Distributed(bridge),
        listeners,
        metrics,
        janitor: Mutex::new(None),
      }),
    })
  }

  /// The initial table capacity, never above a finite entry limit.
  fn table_size_hint(&self) -> usize {
    let bounded = self.entry_limit != 0 && self.entry_limit != usize::MAX;
    if bounded {
      self.initial_size.min(self.entry_limit)
    } else {
      self.initial_size
    }
  }
}
