use std::fmt;
use std::sync::Arc;

/// Describes why a batch of values left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvictionReason {
  /// A generational sweep ran because an insert found the cache at its entry limit.
  Capacity,
  /// A timed generational sweep condemned the values, or the provider expired them.
  Expired,
  /// The values were removed explicitly, by `remove`, `clear`, or the provider.
  Invalidated,
  /// An insert overwrote the value under the same key.
  Replaced,
}

impl fmt::Display for EvictionReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      EvictionReason::Capacity => write!(f, "evicted due to entry limit"),
      EvictionReason::Expired => write!(f, "evicted due to expiration"),
      EvictionReason::Invalidated => write!(f, "manually invalidated"),
      EvictionReason::Replaced => write!(f, "replaced by a newer value"),
    }
  }
}

/// A listener that is told which values were evicted from the cache.
///
/// `evicted` is called synchronously on the thread whose operation caused
/// the eviction, with a non-empty batch. The cache's internal lock is not
/// held during the call, so a listener may call back into the cache, but a
/// slow listener delays the triggering operation.
pub trait EvictionListener<V>: Send + Sync {
  fn evicted(&self, values: &[Arc<V>], reason: EvictionReason);
}

impl<V, F> EvictionListener<V> for F
where
  F: Fn(&[Arc<V>], EvictionReason) + Send + Sync,
{
  fn evicted(&self, values: &[Arc<V>], reason: EvictionReason) {
    self(values, reason)
  }
}

/// The ordered set of listeners registered with a cache.
pub(crate) struct Listeners<V> {
  listeners: Box<[Arc<dyn EvictionListener<V>>]>,
}

impl<V> Listeners<V> {
  pub(crate) fn new(listeners: Vec<Arc<dyn EvictionListener<V>>>) -> Self {
    Self {
      listeners: listeners.into_boxed_slice(),
    }
  }

  #[inline]
  pub(crate) fn is_empty(&self) -> bool {
    self.listeners.is_empty()
  }

  #[inline]
  pub(crate) fn len(&self) -> usize {
    self.listeners.len()
  }

  /// Delivers one batch to every listener. Empty batches are dropped.
  pub(crate) fn notify(&self, values: &[Arc<V>], reason: EvictionReason) {
    if values.is_empty() {
      return;
    }
    for listener in self.listeners.iter() {
      listener.evicted(values, reason);
    }
  }
}

impl<V> fmt::Debug for Listeners<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Listeners")
      .field("count", &self.listeners.len())
      .finish()
  }
}
