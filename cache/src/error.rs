use thiserror::Error;

/// Errors that can occur when building a cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
  /// A configured timeout could not be parsed as a duration.
  #[error("invalid timeout '{value}': {reason}")]
  InvalidTimeout { value: String, reason: String },
  /// The eviction scheduler thread could not be started.
  #[error("failed to start the eviction scheduler: {0}")]
  SchedulerSpawn(String),
}

/// Errors surfaced by cache operations.
///
/// The local generational engine never fails. These only come out of the
/// distributed mode, where the provider handle has to be opened and values
/// cross a serialization boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
  /// The provider source could not produce a live provider handle.
  #[error("cache provider unavailable: {reason}")]
  ProviderUnavailable { reason: String },

  /// A call into an open provider failed.
  #[error("cache provider operation failed: {0}")]
  Provider(String),

  #[error("failed to serialize value: {0}")]
  Serialization(String),

  #[error("failed to deserialize value: {0}")]
  Deserialization(String),
}

/// A specialized `Result` type for cache operations.
pub type Result<T, E = CacheError> = std::result::Result<T, E>;
