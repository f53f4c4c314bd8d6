use std::fmt;
use std::sync::Arc;

/// A box around a cached value.
///
/// An `Entry` with no value is a placeholder: it is reserved in the primary
/// generation on a lookup miss so that racing lookups for the same key all
/// converge on one `Entry` instead of each creating their own. A resolved
/// entry is never mutated; replacing a value always installs a new `Entry`.
pub struct Entry<V> {
  value: Option<Arc<V>>,
}

impl<V> Entry<V> {
  /// Creates a placeholder entry holding no value.
  #[inline]
  pub(crate) fn placeholder() -> Self {
    Self { value: None }
  }

  /// Creates an entry holding `value`.
  #[inline]
  pub(crate) fn resolved(value: Arc<V>) -> Self {
    Self { value: Some(value) }
  }

  /// Returns a clone of the `Arc` holding the value, or `None` for a placeholder.
  #[inline]
  pub fn value(&self) -> Option<Arc<V>> {
    self.value.clone()
  }

  #[inline]
  pub fn is_placeholder(&self) -> bool {
    self.value.is_none()
  }
}

impl<V> fmt::Debug for Entry<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Entry")
      .field("placeholder", &self.is_placeholder())
      .finish()
  }
}
