//! Encryption decorator for any [`KeyValueStore`].
//!
//! Values are serialized to canonical JSON text, encrypted with AES-256-GCM under
//! a random 12-byte nonce, and handed to the inner store as
//! `base64(nonce || ciphertext)`. The inner store never sees plaintext.
//!
//! Reads that fail to decrypt (rotated key, corrupted record) are reported as
//! absent. Writes that fail to encrypt are errors; there is no plaintext fallback.

use std::time::Duration;

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::Rng;
use serde_json::Value;

use crate::keys::EncryptionKey;
use crate::traits::{KeyValueStore, Result, StoreError, collection_or_default};

const NONCE_LEN: usize = 12;

pub struct EncryptedStore<S> {
    inner: S,
    cipher: Aes256Gcm,
}

impl<S: KeyValueStore> EncryptedStore<S> {
    pub fn new(inner: S, key: &EncryptionKey) -> Self {
        let cipher = Aes256Gcm::new(&Key::<Aes256Gcm>::from(*key.as_bytes()));
        Self { inner, cipher }
    }

    /// Wrap `inner` with a base64-encoded key, failing if the key is malformed.
    pub fn with_encoded_key(inner: S, key: &str) -> Result<Self> {
        let key = EncryptionKey::from_base64(key)?;
        Ok(Self::new(inner, &key))
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn encrypt(&self, plaintext: &str) -> Result<String> {
        let nonce_bytes: [u8; NONCE_LEN] = rand::rng().random();
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| StoreError::Encryption("AES-256-GCM encryption failed".to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(sealed))
    }

    fn decrypt(&self, sealed: &str) -> Result<String> {
        let bytes = STANDARD
            .decode(sealed)
            .map_err(|_| StoreError::Encryption("ciphertext is not valid base64".to_string()))?;
        if bytes.len() < NONCE_LEN {
            return Err(StoreError::Encryption("ciphertext too short".to_string()));
        }

        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| {
                StoreError::Encryption("authentication failed (wrong key or corrupted data)".into())
            })?;

        String::from_utf8(plaintext)
            .map_err(|_| StoreError::Encryption("decrypted value is not UTF-8".to_string()))
    }
}

#[async_trait]
impl<S: KeyValueStore> KeyValueStore for EncryptedStore<S> {
    async fn get(&self, key: &str, collection: Option<&str>) -> Result<Option<Value>> {
        let sealed = match self.inner.get(key, collection).await? {
            None => return Ok(None),
            Some(Value::String(sealed)) => sealed,
            Some(_) => {
                tracing::error!(
                    "Record '{}' in collection '{}' is not ciphertext, treating as absent",
                    key,
                    collection_or_default(collection)
                );
                return Ok(None);
            }
        };

        match self.decrypt(&sealed) {
            // Plain strings written by older tooling are returned as-is.
            Ok(text) => Ok(Some(serde_json::from_str(&text).unwrap_or(Value::String(text)))),
            Err(e) => {
                tracing::error!(
                    "Decryption failed for key '{}' in collection '{}': {}",
                    key,
                    collection_or_default(collection),
                    e
                );
                Ok(None)
            }
        }
    }

    async fn put(
        &self,
        key: &str,
        value: Value,
        collection: Option<&str>,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let plaintext = serde_json::to_string(&value)?;
        let sealed = self.encrypt(&plaintext)?;
        self.inner.put(key, Value::String(sealed), collection, ttl).await
    }

    async fn delete(&self, key: &str, collection: Option<&str>) -> Result<()> {
        self.inner.delete(key, collection).await
    }
}
