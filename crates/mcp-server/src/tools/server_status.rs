//! GetServerStatus tool - client capabilities, both root sets and the storage backend.

use std::time::Duration;

use rmcp::model::{CallToolResult, ClientCapabilities, ErrorData};
use root_scope::{ClientRoots, PathAuthorizer};
use secure_store::{KeyValueStore, StorageMode};
use serde::Serialize;
use serde_json::json;

use super::json_result;

const HEALTH_COLLECTION: &str = "_status";
const HEALTH_KEY: &str = "health";

#[derive(Debug, Serialize)]
struct ServerStatus {
    transport: &'static str,
    client_features: ClientFeatures,
    client_roots: Vec<String>,
    server_roots: Vec<String>,
    sensitive_extensions: Vec<String>,
    storage: StorageStatus,
}

/// Optional capabilities the client declared at initialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClientFeatures {
    pub roots: bool,
    pub elicitation: bool,
    pub sampling: bool,
}

impl From<&ClientCapabilities> for ClientFeatures {
    fn from(capabilities: &ClientCapabilities) -> Self {
        Self {
            roots: capabilities.roots.is_some(),
            elicitation: capabilities.elicitation.is_some(),
            sampling: capabilities.sampling.is_some(),
        }
    }
}

#[derive(Debug, Serialize)]
struct StorageStatus {
    mode: &'static str,
    encrypted: bool,
    reachable: bool,
}

/// Execute the GetServerStatus tool.
pub async fn execute(
    authorizer: &PathAuthorizer,
    client: Option<&dyn ClientRoots>,
    features: ClientFeatures,
    store: &dyn KeyValueStore,
    mode: StorageMode,
) -> Result<CallToolResult, ErrorData> {
    let client_roots = match client {
        Some(client) if features.roots => authorizer
            .resolver()
            .fetch_client_roots(client)
            .await
            .iter()
            .map(|root| root.to_string())
            .collect(),
        _ => Vec::new(),
    };

    let status = ServerStatus {
        transport: "stdio",
        client_features: features,
        client_roots,
        server_roots: authorizer
            .registry()
            .snapshot()
            .iter()
            .map(|root| root.to_string())
            .collect(),
        sensitive_extensions: authorizer
            .sensitive_extensions()
            .iter()
            .map(str::to_string)
            .collect(),
        storage: StorageStatus {
            mode: mode.as_str(),
            encrypted: mode.is_persistent(),
            reachable: round_trip(store).await,
        },
    };

    json_result(&status)
}

/// Write, read back and delete a short-lived record.
async fn round_trip(store: &dyn KeyValueStore) -> bool {
    let expected = json!("ok");
    let ttl = Some(Duration::from_secs(60));
    if let Err(e) = store
        .put(HEALTH_KEY, expected.clone(), Some(HEALTH_COLLECTION), ttl)
        .await
    {
        tracing::warn!("Storage health write failed: {}", e);
        return false;
    }

    let reachable = match store.get(HEALTH_KEY, Some(HEALTH_COLLECTION)).await {
        Ok(value) => value.as_ref() == Some(&expected),
        Err(e) => {
            tracing::warn!("Storage health read failed: {}", e);
            false
        }
    };

    if let Err(e) = store.delete(HEALTH_KEY, Some(HEALTH_COLLECTION)).await {
        tracing::debug!("Storage health cleanup failed: {}", e);
    }
    reachable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::result_text;
    use async_trait::async_trait;
    use root_scope::{
        ClientRootsError, Root, RootRegistry, RootResolver, RootSource, SensitiveExtensions,
    };
    use secure_store::{
        DiskStore, EncryptedStore, EncryptionKey, MemoryStore, Result as StoreResult, StoreError,
    };
    use serde_json::Value;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Client {
        roots: Vec<String>,
    }

    #[async_trait]
    impl ClientRoots for Client {
        fn supports_roots(&self) -> bool {
            true
        }

        async fn list_roots(&self) -> Result<Vec<String>, ClientRootsError> {
            Ok(self.roots.clone())
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str, _collection: Option<&str>) -> StoreResult<Option<Value>> {
            Err(StoreError::BackendUnavailable("down".to_string()))
        }

        async fn put(
            &self,
            _key: &str,
            _value: Value,
            _collection: Option<&str>,
            _ttl: Option<Duration>,
        ) -> StoreResult<()> {
            Err(StoreError::BackendUnavailable("down".to_string()))
        }

        async fn delete(&self, _key: &str, _collection: Option<&str>) -> StoreResult<()> {
            Err(StoreError::BackendUnavailable("down".to_string()))
        }
    }

    fn create_test_env() -> (TempDir, PathAuthorizer) {
        let temp_dir = TempDir::new().unwrap();
        let root = Root::from_directory(temp_dir.path(), RootSource::Static).unwrap();
        let registry = Arc::new(RootRegistry::with_roots([root]));
        let authorizer =
            PathAuthorizer::new(registry, RootResolver::default(), SensitiveExtensions::default());
        (temp_dir, authorizer)
    }

    fn features(roots: bool) -> ClientFeatures {
        ClientFeatures {
            roots,
            ..ClientFeatures::default()
        }
    }

    #[test]
    fn test_features_follow_declared_capabilities() {
        let declared: ClientCapabilities =
            serde_json::from_value(serde_json::json!({"elicitation": {}, "sampling": {}})).unwrap();
        assert_eq!(
            ClientFeatures::from(&declared),
            ClientFeatures {
                roots: false,
                elicitation: true,
                sampling: true,
            }
        );

        let declared: ClientCapabilities =
            serde_json::from_value(serde_json::json!({"roots": {"listChanged": true}})).unwrap();
        assert_eq!(ClientFeatures::from(&declared), features(true));
        assert_eq!(ClientFeatures::from(&ClientCapabilities::default()), features(false));
    }

    #[tokio::test]
    async fn test_status_without_client_roots() {
        let (temp_dir, authorizer) = create_test_env();
        let store = MemoryStore::new();
        let client = Client {
            roots: vec!["/tmp".to_string()],
        };

        let result = execute(
            &authorizer,
            Some(&client),
            features(false),
            &store,
            StorageMode::Ephemeral,
        )
        .await
        .unwrap();
        let json: Value = serde_json::from_str(&result_text(&result)).unwrap();

        assert_eq!(json["transport"], "stdio");
        assert_eq!(json["client_features"]["roots"], false);
        assert_eq!(json["client_roots"], Value::Array(vec![]));
        assert_eq!(
            json["server_roots"][0],
            temp_dir.path().canonicalize().unwrap().display().to_string()
        );
        assert_eq!(json["storage"]["mode"], "ephemeral");
        assert_eq!(json["storage"]["encrypted"], false);
        assert_eq!(json["storage"]["reachable"], true);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_status_reports_every_client_feature() {
        let (_temp_dir, authorizer) = create_test_env();
        let client_dir = TempDir::new().unwrap();
        let client = Client {
            roots: vec![client_dir.path().display().to_string()],
        };
        let all = ClientFeatures {
            roots: true,
            elicitation: true,
            sampling: true,
        };

        let result = execute(
            &authorizer,
            Some(&client),
            all,
            &MemoryStore::new(),
            StorageMode::Ephemeral,
        )
        .await
        .unwrap();
        let json: Value = serde_json::from_str(&result_text(&result)).unwrap();

        assert_eq!(json["client_features"]["roots"], true);
        assert_eq!(json["client_features"]["elicitation"], true);
        assert_eq!(json["client_features"]["sampling"], true);
        assert_eq!(
            json["client_roots"][0],
            client_dir.path().canonicalize().unwrap().display().to_string()
        );
    }

    #[tokio::test]
    async fn test_status_checks_encrypted_disk() {
        let (temp_dir, authorizer) = create_test_env();
        let disk = DiskStore::new(temp_dir.path().join("store.json"));
        let store = EncryptedStore::new(disk, &EncryptionKey::generate());

        let result = execute(&authorizer, None, features(false), &store, StorageMode::Disk)
            .await
            .unwrap();
        let json: Value = serde_json::from_str(&result_text(&result)).unwrap();

        assert_eq!(json["client_features"]["elicitation"], false);
        assert_eq!(json["client_features"]["sampling"], false);
        assert_eq!(json["storage"]["mode"], "disk");
        assert_eq!(json["storage"]["encrypted"], true);
        assert_eq!(json["storage"]["reachable"], true);
    }

    #[tokio::test]
    async fn test_status_reports_unreachable_store() {
        let (_temp_dir, authorizer) = create_test_env();
        let mode = StorageMode::Networked;
        let result = execute(&authorizer, None, features(false), &BrokenStore, mode)
            .await
            .unwrap();
        let json: Value = serde_json::from_str(&result_text(&result)).unwrap();
        assert_eq!(json["storage"]["reachable"], false);
    }
}
