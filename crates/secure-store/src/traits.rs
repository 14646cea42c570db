//! Key-value store trait definition and error types.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Collection used when a caller does not name one.
pub const DEFAULT_COLLECTION: &str = "default";

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached (connection refused, timeout, dropped link)
    #[error("Storage backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Bad key material or a failed encryption on write
    #[error("Encryption failure: {0}")]
    Encryption(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Uniform get/put/delete contract over `(collection, key)`.
///
/// Values are opaque strings or structured JSON. A `put` replaces any previous
/// value for the same address entirely. An expired record reads as absent.
///
/// Implementations: [`MemoryStore`](crate::MemoryStore),
/// [`DiskStore`](crate::DiskStore), [`RedisStore`](crate::RedisStore), and the
/// [`EncryptedStore`](crate::EncryptedStore) decorator over any of them.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value. `collection` defaults to [`DEFAULT_COLLECTION`].
    async fn get(&self, key: &str, collection: Option<&str>) -> Result<Option<Value>>;

    /// Write a value, optionally expiring after `ttl`.
    async fn put(
        &self,
        key: &str,
        value: Value,
        collection: Option<&str>,
        ttl: Option<Duration>,
    ) -> Result<()>;

    /// Remove a value. Deleting an absent key is not an error.
    async fn delete(&self, key: &str, collection: Option<&str>) -> Result<()>;
}

/// Resolve an optional collection name to the one actually used.
pub fn collection_or_default(collection: Option<&str>) -> &str {
    match collection {
        Some(name) if !name.is_empty() => name,
        _ => DEFAULT_COLLECTION,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_defaults() {
        assert_eq!(collection_or_default(None), "default");
        assert_eq!(collection_or_default(Some("")), "default");
        assert_eq!(collection_or_default(Some("auth")), "auth");
    }
}
