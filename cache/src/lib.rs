//! An in-process cache for authentication results.
//!
//! Resolving a security subject (checking a Basic-Auth credential, mapping
//! a token to its principals) is expensive and the same callers repeat it
//! constantly. This crate memoizes those results behind a bounded,
//! self-evicting cache built for one access pattern: keyed get-or-create
//! lookups with periodic bulk eviction.
//!
//! # Features
//! - **Generational LRU**: Three tables (primary, secondary, tertiary)
//!   approximate LRU order. A lookup promotes an entry back to primary;
//!   a rotation shifts every table down one tier and drops the tertiary.
//! - **Bounded**: An insert that would exceed the entry limit rotates first.
//! - **Timed eviction**: A background scheduler rotates every half timeout.
//! - **Eviction listeners**: Evicted values are reported in batches,
//!   synchronously, on the thread that caused the eviction.
//! - **Distributed mode**: Storage and eviction can be delegated to an
//!   external cache provider; its removal and expiry events reach the same
//!   listeners.

// Public modules that form the API
pub mod builder;
pub mod error;
pub mod handles;
pub mod listener;
pub mod metrics;
pub mod object;
pub mod provider;
pub mod serializer;

// Internal, crate-only modules
mod bridge;
mod engine;
mod entry;
mod generations;
mod shared;
mod task;

// Re-export the primary user-facing types for convenience
pub use builder::{CacheBuilder, CacheConfig};
pub use entry::Entry;
pub use error::{BuildError, CacheError, Result};
pub use generations::Generation;
pub use handles::Cache;
pub use listener::{EvictionListener, EvictionReason};
pub use metrics::MetricsSnapshot;
pub use object::{CacheObject, Subject};
pub use provider::{CacheEntryEvent, CacheEntryListener, CacheProvider, ProviderSource};
#[cfg(feature = "serde")]
pub use serializer::BincodeSerializer;
pub use serializer::ValueSerializer;
