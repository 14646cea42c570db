//! Key-value storage for the server's long-lived secrets (OAuth clients, tokens,
//! session state).
//!
//! One [`KeyValueStore`] trait with three backends ([`MemoryStore`],
//! [`DiskStore`], [`RedisStore`]) and an [`EncryptedStore`] decorator that keeps
//! only AES-256-GCM ciphertext in whatever it wraps. [`select_storage`] picks the
//! combination once at startup.

mod disk;
mod encrypted;
mod keys;
mod memory;
mod networked;
mod record;
mod selector;
mod traits;

pub use disk::DiskStore;
pub use encrypted::EncryptedStore;
pub use keys::{ENCRYPTION_KEY_LEN, EncryptionKey, SigningKey};
pub use memory::MemoryStore;
pub use networked::{DEFAULT_CONNECT_TIMEOUT, RedisStore};
pub use selector::{
    DEFAULT_DATA_DIR, DEFAULT_REDIS_URL, DISK_STORE_FILE, SelectedStorage, StorageConfig,
    StorageMode, select_storage,
};
pub use traits::{DEFAULT_COLLECTION, KeyValueStore, Result, StoreError, collection_or_default};
