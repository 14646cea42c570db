//! Ephemeral in-memory store. Contents are lost when the process exits.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::record::StoredValue;
use crate::traits::{KeyValueStore, Result, collection_or_default};

type Address = (String, String);

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<Address, StoredValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held, including expired ones not yet dropped.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Address, StoredValue>> {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Address, StoredValue>> {
        self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn address(key: &str, collection: Option<&str>) -> Address {
    (collection_or_default(collection).to_string(), key.to_string())
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str, collection: Option<&str>) -> Result<Option<Value>> {
        let address = address(key, collection);
        let now = Utc::now();

        match self.read().get(&address) {
            None => return Ok(None),
            Some(stored) if !stored.is_expired(now) => return Ok(Some(stored.value.clone())),
            Some(_) => {}
        }

        // Re-check under the write lock; a concurrent put may have refreshed it.
        let mut entries = self.write();
        if entries.get(&address).is_some_and(|s| s.is_expired(now)) {
            entries.remove(&address);
        }
        Ok(None)
    }

    async fn put(
        &self,
        key: &str,
        value: Value,
        collection: Option<&str>,
        ttl: Option<Duration>,
    ) -> Result<()> {
        self.write().insert(address(key, collection), StoredValue::new(value, ttl));
        Ok(())
    }

    async fn delete(&self, key: &str, collection: Option<&str>) -> Result<()> {
        self.write().remove(&address(key, collection));
        Ok(())
    }
}
