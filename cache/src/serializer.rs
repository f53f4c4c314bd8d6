#[cfg(feature = "serde")]
use crate::error::CacheError;
use crate::error::Result;

use tracing::error;

/// Converts cached values to and from the bytes handed to a cache provider.
///
/// Implementations report failures as errors; the bridge logs them and
/// treats the value as absent, so a failure never reaches a cache caller.
pub trait ValueSerializer<V>: Send + Sync {
  fn serialize(&self, value: &V) -> Result<Vec<u8>>;

  fn deserialize(&self, bytes: &[u8]) -> Result<V>;
}

/// Serializes an optional value. `None` in, or a failed encode, gives `None` out.
pub fn encode<V, S>(serializer: &S, value: Option<&V>) -> Option<Vec<u8>>
where
  S: ValueSerializer<V> + ?Sized,
{
  let value = value?;
  match serializer.serialize(value) {
    Ok(bytes) => Some(bytes),
    Err(err) => {
      error!(error = %err, "Error serializing cache value");
      None
    }
  }
}

/// Deserializes optional bytes. `None` in, or a failed decode, gives `None` out.
pub fn decode<V, S>(serializer: &S, bytes: Option<&[u8]>) -> Option<V>
where
  S: ValueSerializer<V> + ?Sized,
{
  let bytes = bytes?;
  match serializer.deserialize(bytes) {
    Ok(value) => Some(value),
    Err(err) => {
      error!(error = %err, len = bytes.len(), "Error deserializing cache value");
      None
    }
  }
}

/// The default serializer, encoding any `serde` type with `bincode`.
#[cfg(feature = "serde")]
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeSerializer;

#[cfg(feature = "serde")]
impl<V> ValueSerializer<V> for BincodeSerializer
where
  V: serde::Serialize + serde::de::DeserializeOwned,
{
  fn serialize(&self, value: &V) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| CacheError::Serialization(e.to_string()))
  }

  fn deserialize(&self, bytes: &[u8]) -> Result<V> {
    bincode::deserialize(bytes).map_err(|e| CacheError::Deserialization(e.to_string()))
  }
}
