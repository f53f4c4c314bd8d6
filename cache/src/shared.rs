use crate::bridge::Bridge;
use crate::engine::LocalEngine;
use crate::listener::{EvictionReason, Listeners};
use crate::metrics::Metrics;
use crate::task::janitor::Janitor;

use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

/// Where the cache keeps its entries.
pub(crate) enum Backend<K, V, H> {
  /// The in-process generational tables.
  Local(LocalEngine<K, V, H>),
  /// An external provider reached through the bridge.
  Distributed(Bridge<K, V>),
}

/// The internal, thread-safe core of the cache.
pub(crate) struct CacheShared<K, V, H> {
  pub(crate) backend: Backend<K, V, H>,
  pub(crate) listeners: Arc<Listeners<V>>,
  pub(crate) metrics: Arc<Metrics>,
  pub(crate) janitor: Mutex<Option<Janitor>>,
}

impl<K, V, H> fmt::Debug for CacheShared<K, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mode = match &self.backend {
      Backend::Local(_) => "local",
      Backend::Distributed(_) => "distributed",
    };
    f.debug_struct("CacheShared")
      .field("mode", &mode)
      .field("listeners", &self.listeners.len())
      .field("metrics", &self.metrics.snapshot())
      .finish_non_exhaustive()
  }
}

impl<K, V, H> Drop for CacheShared<K, V, H> {
  fn drop(&mut self) {
    if let Some(janitor) = self.janitor.get_mut().take() {
      janitor.stop();
    }
  }
}

impl<K, V, H> CacheShared<K, V, H>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  H: BuildHasher + Clone + Send + Sync + 'static,
{
  /// Runs one timed rotation of the local generations and notifies listeners.
  pub(crate) fn evict_stale_entries(&self) {
    if let Backend::Local(engine) = &self.backend {
      engine
        .evict_stale_entries(EvictionReason::Expired)
        .deliver(&self.listeners);
    }
  }

  /// Starts the eviction scheduler, rotating every half `timeout`.
  pub(crate) fn start_janitor(shared: &Arc<Self>, timeout: Duration) -> std::io::Result<()> {
    let period = timeout / 2;
    if period.is_zero() {
      return Ok(());
    }

    let weak: Weak<Self> = Arc::downgrade(shared);
    let janitor = Janitor::spawn(period, move || match weak.upgrade() {
      Some(shared) => {
        shared.evict_stale_entries();
        true
      }
      None => false,
    })?;

    *shared.janitor.lock() = Some(janitor);
    Ok(())
  }

  pub(crate) fn stop_janitor(&self) {
    // Release the slot before joining the thread.
    let janitor = self.janitor.lock().take();
    if let Some(janitor) = janitor {
      janitor.stop();
    }
  }
}
