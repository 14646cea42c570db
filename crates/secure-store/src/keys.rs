//! Signing and storage-encryption key material.
//!
//! Neither type prints its contents through `Debug`, so keys never end up in logs.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use rand::Rng;

use crate::traits::{Result, StoreError};

/// Length of the storage-encryption key in bytes (AES-256).
pub const ENCRYPTION_KEY_LEN: usize = 32;

/// Key used by the auth layer to sign session tokens.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey(String);

impl SigningKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Random 32-byte key, URL-safe base64 without padding.
    pub fn generate() -> Self {
        let bytes: [u8; 32] = rand::rng().random();
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

/// Fixed-length symmetric key for [`EncryptedStore`](crate::EncryptedStore).
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey([u8; ENCRYPTION_KEY_LEN]);

impl EncryptionKey {
    pub fn from_bytes(bytes: [u8; ENCRYPTION_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Decode a base64 key (URL-safe or standard alphabet, padding optional).
    ///
    /// Anything that does not decode to exactly 32 bytes is rejected.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let unpadded = encoded.trim().trim_end_matches('=');
        let bytes = URL_SAFE_NO_PAD
            .decode(unpadded)
            .or_else(|_| STANDARD_NO_PAD.decode(unpadded))
            .map_err(|_| {
                StoreError::Encryption("storage encryption key is not valid base64".to_string())
            })?;

        let bytes: [u8; ENCRYPTION_KEY_LEN] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            StoreError::Encryption(format!(
                "storage encryption key must be {} bytes, got {}",
                ENCRYPTION_KEY_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    pub fn generate() -> Self {
        Self(rand::rng().random())
    }

    /// URL-safe base64 with padding, the form printed by `keygen`.
    pub fn to_base64(&self) -> String {
        URL_SAFE.encode(self.0)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; ENCRYPTION_KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(<redacted>)")
    }
}
