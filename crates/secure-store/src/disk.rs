//! Single-document JSON store on disk.
//!
//! The whole store is one JSON object keyed by collection, then by key. Every
//! operation loads the document, modifies it and writes it back (temp file +
//! rename, so a crash never leaves a half-written document).
//!
//! Known limitation: the read-modify-write is not atomic across writers. Two
//! concurrent `put`s, from this process or another, can lose one of the updates.
//! The server process is the only intended writer of its store file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use serde_json::Value;
use tokio::fs;

use crate::record::StoredValue;
use crate::traits::{KeyValueStore, Result, collection_or_default};

/// collection -> key -> value
type Document = BTreeMap<String, BTreeMap<String, StoredValue>>;

#[derive(Debug, Clone)]
pub struct DiskStore {
    path: PathBuf,
}

impl DiskStore {
    /// Store backed by the file at `path`. Parent directories are created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unparsable documents read as empty.
    async fn load(&self) -> Result<Document> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Document::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&content) {
            Ok(document) => Ok(document),
            Err(e) => {
                tracing::warn!(
                    "Store document {} is not valid JSON ({}), treating it as empty",
                    self.path.display(),
                    e
                );
                Ok(Document::new())
            }
        }
    }

    async fn save(&self, mut document: Document) -> Result<()> {
        let now = Utc::now();
        for entries in document.values_mut() {
            entries.retain(|_, stored| !stored.is_expired(now));
        }
        document.retain(|_, entries| !entries.is_empty());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let content = serde_json::to_string_pretty(&document)?;
        Self::atomic_write(&self.path, &content).await?;
        Ok(())
    }

    async fn atomic_write(path: &Path, content: &str) -> std::io::Result<()> {
        let suffix: u64 = rand::rng().random();
        let temp_path = path.with_extension(format!("{:016x}.tmp", suffix));

        if let Err(e) = fs::write(&temp_path, content).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp_path, path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for DiskStore {
    async fn get(&self, key: &str, collection: Option<&str>) -> Result<Option<Value>> {
        let document = self.load().await?;
        let value = document
            .get(collection_or_default(collection))
            .and_then(|entries| entries.get(key))
            .filter(|stored| !stored.is_expired(Utc::now()))
            .map(|stored| stored.value.clone());
        Ok(value)
    }

    async fn put(
        &self,
        key: &str,
        value: Value,
        collection: Option<&str>,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let mut document = self.load().await?;
        document
            .entry(collection_or_default(collection).to_string())
            .or_default()
            .insert(key.to_string(), StoredValue::new(value, ttl));
        self.save(document).await
    }

    async fn delete(&self, key: &str, collection: Option<&str>) -> Result<()> {
        let mut document = self.load().await?;
        let removed = document
            .get_mut(collection_or_default(collection))
            .and_then(|entries| entries.remove(key))
            .is_some();
        if removed {
            self.save(document).await?;
        }
        Ok(())
    }
}
