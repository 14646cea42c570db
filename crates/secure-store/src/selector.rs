//! Bootstrap-time choice of storage backend.
//!
//! | keys configured | persist | networked | result                                  |
//! |-----------------|---------|-----------|-----------------------------------------|
//! | yes             | yes     | yes       | Redis + encryption, Disk on failure     |
//! | yes             | yes     | no        | Disk + encryption                       |
//! | otherwise       |         |           | Memory, fresh signing key for this run  |

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::disk::DiskStore;
use crate::encrypted::EncryptedStore;
use crate::keys::{EncryptionKey, SigningKey};
use crate::memory::MemoryStore;
use crate::networked::{DEFAULT_CONNECT_TIMEOUT, RedisStore};
use crate::traits::{KeyValueStore, Result};

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_DATA_DIR: &str = ".guarded_fs_storage";
pub const DISK_STORE_FILE: &str = "store.json";

#[derive(Clone)]
pub struct StorageConfig {
    pub signing_key: Option<String>,
    pub encryption_key: Option<String>,
    pub persist: bool,
    pub networked: bool,
    pub redis_url: String,
    pub data_dir: PathBuf,
    pub connect_timeout: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            signing_key: None,
            encryption_key: None,
            persist: false,
            networked: false,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl StorageConfig {
    fn configured_keys(&self) -> Option<(&str, &str)> {
        let signing = self.signing_key.as_deref().filter(|k| !k.trim().is_empty())?;
        let encryption = self.encryption_key.as_deref().filter(|k| !k.trim().is_empty())?;
        Some((signing, encryption))
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("StorageConfig")
            .field("signing_key", &redact(&self.signing_key))
            .field("encryption_key", &redact(&self.encryption_key))
            .field("persist", &self.persist)
            .field("networked", &self.networked)
            .field("redis_url", &self.redis_url)
            .field("data_dir", &self.data_dir)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    Networked,
    Disk,
    Ephemeral,
}

impl StorageMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageMode::Networked => "networked",
            StorageMode::Disk => "disk",
            StorageMode::Ephemeral => "ephemeral",
        }
    }

    pub fn is_persistent(&self) -> bool {
        !matches!(self, StorageMode::Ephemeral)
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`select_storage`].
pub struct SelectedStorage {
    pub store: Arc<dyn KeyValueStore>,
    pub signing_key: SigningKey,
    pub mode: StorageMode,
}

impl fmt::Debug for SelectedStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedStorage")
            .field("signing_key", &self.signing_key)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// Pick the store for this process. Called once at startup.
///
/// A networked connection failure falls back to disk. A malformed encryption
/// key is returned as an error instead.
pub async fn select_storage(config: &StorageConfig) -> Result<SelectedStorage> {
    let Some((signing, encryption)) = config.configured_keys().filter(|_| config.persist) else {
        if config.persist {
            tracing::warn!("Persistent storage requested but signing/encryption keys are missing");
        }
        tracing::warn!("Using ephemeral in-memory storage; sessions will not survive a restart");
        return Ok(SelectedStorage {
            store: Arc::new(MemoryStore::new()),
            signing_key: SigningKey::generate(),
            mode: StorageMode::Ephemeral,
        });
    };

    let key = EncryptionKey::from_base64(encryption)?;
    let signing_key = SigningKey::new(signing);

    if config.networked {
        tracing::info!("Connecting to Redis at {}", config.redis_url);
        match RedisStore::connect(&config.redis_url, config.connect_timeout).await {
            Ok(redis) => {
                tracing::info!("Using encrypted Redis storage");
                return Ok(SelectedStorage {
                    store: Arc::new(EncryptedStore::new(redis, &key)),
                    signing_key,
                    mode: StorageMode::Networked,
                });
            }
            Err(e) => tracing::error!("Redis unavailable ({}), falling back to disk", e),
        }
    }

    let path = config.data_dir.join(DISK_STORE_FILE);
    tracing::info!("Using encrypted disk storage at {}", path.display());
    Ok(SelectedStorage {
        store: Arc::new(EncryptedStore::new(DiskStore::new(path), &key)),
        signing_key,
        mode: StorageMode::Disk,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::StoreError;
    use serde_json::json;
    use tempfile::TempDir;

    fn keyed_config(data_dir: PathBuf) -> StorageConfig {
        StorageConfig {
            signing_key: Some("signing-secret".to_string()),
            encryption_key: Some(EncryptionKey::generate().to_base64()),
            persist: true,
            data_dir,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_no_keys_is_ephemeral_with_fresh_signing_key() {
        let a = select_storage(&StorageConfig::default()).await.unwrap();
        let b = select_storage(&StorageConfig::default()).await.unwrap();

        assert_eq!(a.mode, StorageMode::Ephemeral);
        assert_ne!(a.signing_key, b.signing_key);
    }

    #[tokio::test]
    async fn test_keys_without_persist_is_ephemeral() {
        let temp = TempDir::new().unwrap();
        let config = StorageConfig {
            persist: false,
            ..keyed_config(temp.path().to_path_buf())
        };

        let selected = select_storage(&config).await.unwrap();
        assert_eq!(selected.mode, StorageMode::Ephemeral);
        assert_ne!(selected.signing_key.as_str(), "signing-secret");
    }

    #[tokio::test]
    async fn test_persist_with_one_key_is_ephemeral() {
        let config = StorageConfig {
            encryption_key: None,
            ..keyed_config(PathBuf::from("unused"))
        };
        assert_eq!(select_storage(&config).await.unwrap().mode, StorageMode::Ephemeral);
    }

    #[tokio::test]
    async fn test_keys_and_persist_is_encrypted_disk() {
        let temp = TempDir::new().unwrap();
        let selected = select_storage(&keyed_config(temp.path().join("data"))).await.unwrap();

        assert_eq!(selected.mode, StorageMode::Disk);
        assert_eq!(selected.signing_key.as_str(), "signing-secret");

        selected.store.put("token", json!("abc123"), Some("auth"), None).await.unwrap();
        let raw = std::fs::read_to_string(temp.path().join("data").join(DISK_STORE_FILE)).unwrap();
        assert!(!raw.contains("abc123"));
    }

    #[tokio::test]
    async fn test_networked_without_persist_is_ephemeral() {
        let config = StorageConfig {
            persist: false,
            networked: true,
            ..keyed_config(PathBuf::from("unused"))
        };
        assert_eq!(select_storage(&config).await.unwrap().mode, StorageMode::Ephemeral);
    }

    #[tokio::test]
    async fn test_unreachable_redis_falls_back_to_disk() {
        let temp = TempDir::new().unwrap();
        let config = StorageConfig {
            networked: true,
            redis_url: "redis://127.0.0.1:1".to_string(),
            connect_timeout: Duration::from_secs(2),
            ..keyed_config(temp.path().to_path_buf())
        };

        let selected = select_storage(&config).await.unwrap();
        assert_eq!(selected.mode, StorageMode::Disk);
        selected.store.put("k", json!("v"), None, None).await.unwrap();
        assert_eq!(selected.store.get("k", None).await.unwrap(), Some(json!("v")));
    }

    #[tokio::test]
    async fn test_malformed_encryption_key_is_an_error() {
        let config = StorageConfig {
            encryption_key: Some("definitely-not-32-bytes".to_string()),
            ..keyed_config(PathBuf::from("unused"))
        };
        assert!(matches!(select_storage(&config).await, Err(StoreError::Encryption(_))));
    }

    #[test]
    fn test_debug_redacts_keys() {
        let config = keyed_config(PathBuf::from("unused"));
        let printed = format!("{:?}", config);
        assert!(!printed.contains("signing-secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_mode_labels() {
        assert_eq!(StorageMode::Networked.to_string(), "networked");
        assert_eq!(StorageMode::Disk.as_str(), "disk");
        assert!(!StorageMode::Ephemeral.is_persistent());
    }
}
