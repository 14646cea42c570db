//! Redis-backed store.
//!
//! Keys are namespaced as `collection:key`. A ttl maps onto Redis native expiry
//! (`SET ... EX`), so expired records disappear without any sweeping on our side.
//! Values are stored as JSON text.
//!
//! Connection or command failures are logged and returned as
//! [`StoreError::BackendUnavailable`]; they never abort the process.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use serde_json::Value;

use crate::traits::{KeyValueStore, Result, StoreError, collection_or_default};

/// Default bound on the initial connection attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Open a multiplexed connection to `url`, giving up after `timeout`.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self> {
        let client = redis::Client::open(url).map_err(|e| unavailable("invalid Redis URL", e))?;

        let connecting = client.get_multiplexed_async_connection();
        let conn = match tokio::time::timeout(timeout, connecting).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => return Err(unavailable("connection failed", e)),
            Err(_) => {
                return Err(StoreError::BackendUnavailable(format!(
                    "connection timed out after {:?}",
                    timeout
                )));
            }
        };

        tracing::info!("Connected to Redis store");
        Ok(Self { conn })
    }
}

fn namespaced_key(collection: Option<&str>, key: &str) -> String {
    format!("{}:{}", collection_or_default(collection), key)
}

fn unavailable(context: &str, err: redis::RedisError) -> StoreError {
    StoreError::BackendUnavailable(format!("{}: {}", context, err))
}

/// Log a failed command and convert it.
fn command_failed(op: &str, key: &str, err: redis::RedisError) -> StoreError {
    tracing::error!("Redis {} failed for '{}': {}", op, key, err);
    unavailable(op, err)
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str, collection: Option<&str>) -> Result<Option<Value>> {
        let full_key = namespaced_key(collection, key);
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(&full_key)
            .await
            .map_err(|e| command_failed("GET", &full_key, e))?;

        Ok(raw.map(|text| serde_json::from_str(&text).unwrap_or(Value::String(text))))
    }

    async fn put(
        &self,
        key: &str,
        value: Value,
        collection: Option<&str>,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let full_key = namespaced_key(collection, key);
        let text = serde_json::to_string(&value)?;
        let mut conn = self.conn.clone();

        let result: redis::RedisResult<()> = match ttl {
            // Redis expiry has one-second granularity; never round down to "no expiry".
            Some(ttl) => conn.set_ex(&full_key, text, ttl.as_secs().max(1)).await,
            None => conn.set(&full_key, text).await,
        };
        result.map_err(|e| command_failed("SET", &full_key, e))
    }

    async fn delete(&self, key: &str, collection: Option<&str>) -> Result<()> {
        let full_key = namespaced_key(collection, key);
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .del(&full_key)
            .await
            .map_err(|e| command_failed("DEL", &full_key, e))?;
        Ok(())
    }
}
