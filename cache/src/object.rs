//! The value type the authentication layer stores in the cache.

use crate::error::Result;
use crate::handles::Cache;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{BuildHasher, Hash};

use parking_lot::{Mutex, MutexGuard};

/// A resolved security subject: who the caller is and what it presented.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Subject {
  pub principals: BTreeSet<String>,
  pub public_credentials: BTreeMap<String, String>,
  pub private_credentials: BTreeMap<String, String>,
  pub read_only: bool,
}

impl Subject {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_principal(mut self, principal: impl Into<String>) -> Self {
    self.principals.insert(principal.into());
    self
  }

  pub fn with_public_credential(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.public_credentials.insert(name.into(), value.into());
    self
  }

  pub fn with_private_credential(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.private_credentials.insert(name.into(), value.into());
    self
  }

  pub fn read_only(mut self) -> Self {
    self.read_only = true;
    self
  }
}

/// A cached subject plus every key it is cached under.
///
/// One authentication result is usually reachable by several keys (a
/// user-id key, a credential-digest key, a token key). The lookup keys are
/// append-only and guarded by a lock the caller holds while iterating, so
/// all of them can be invalidated together.
pub struct CacheObject<K> {
  subject: Subject,
  lookup_keys: Mutex<Vec<K>>,
}

impl<K> CacheObject<K> {
  pub fn new(subject: Subject) -> Self {
    Self {
      subject,
      lookup_keys: Mutex::new(Vec::with_capacity(8)),
    }
  }

  pub fn subject(&self) -> &Subject {
    &self.subject
  }

  pub fn add_lookup_key(&self, key: K) {
    self.lookup_keys.lock().push(key);
  }

  /// Locks and returns the lookup keys. Other threads cannot add keys
  /// while the guard is held.
  pub fn lookup_keys(&self) -> MutexGuard<'_, Vec<K>> {
    self.lookup_keys.lock()
  }

  /// Removes every lookup key from `cache` while holding the key lock.
  ///
  /// Returns how many keys were present. Eviction listeners run during the
  /// removals, so they must not call back into this object's lookup keys.
  pub fn invalidate_in<V, H>(&self, cache: &Cache<K, V, H>) -> Result<usize>
  where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
    H: BuildHasher + Clone + Send + Sync + 'static,
  {
    let keys = self.lookup_keys.lock();
    let mut removed = 0;
    for key in keys.iter() {
      if cache.remove(key)? {
        removed += 1;
      }
    }
    Ok(removed)
  }
}

impl<K: fmt::Debug> fmt::Debug for CacheObject<K> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheObject")
      .field("subject", &self.subject)
      .field("lookup_keys", &*self.lookup_keys.lock())
      .finish()
  }
}

#[cfg(feature = "serde")]
mod persist {
  use super::{CacheObject, Subject};

  use parking_lot::Mutex;
  use serde::{Deserialize, Deserializer, Serialize, Serializer};

  #[derive(Serialize)]
  struct CacheObjectRef<'a, K> {
    subject: &'a Subject,
    lookup_keys: &'a [K],
  }

  #[derive(Deserialize)]
  struct CacheObjectOwned<K> {
    subject: Subject,
    lookup_keys: Vec<K>,
  }

  impl<K: Serialize> Serialize for CacheObject<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
      let keys = self.lookup_keys.lock();
      CacheObjectRef {
        subject: &self.subject,
        lookup_keys: keys.as_slice(),
      }
      .serialize(serializer)
    }
  }

  impl<'de, K: Deserialize<'de>> Deserialize<'de> for CacheObject<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
      let owned = CacheObjectOwned::deserialize(deserializer)?;
      Ok(CacheObject {
        subject: owned.subject,
        lookup_keys: Mutex::new(owned.lookup_keys),
      })
    }
  }
}
