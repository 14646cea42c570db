//! Per-request effective scope: registry roots plus client-asserted roots.
//!
//! The client round trip is the only suspension point on the authorization path.
//! It is bounded by a timeout, and any failure degrades to the registry roots
//! alone. It never widens access beyond what the registry and the client named.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::root::{Root, RootError, RootSource, uri_to_path};

/// Default bound on the client roots round trip.
pub const DEFAULT_CLIENT_ROOTS_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ClientRootsError {
    #[error("Client roots request failed: {0}")]
    Request(String),
}

/// The connected caller's view of its own roots.
///
/// Implemented by the transport layer for a session handle.
#[async_trait]
pub trait ClientRoots: Send + Sync {
    /// Whether the "roots" capability was negotiated for this session.
    fn supports_roots(&self) -> bool;

    /// Ask the client for its roots, as URIs (`file://...`) or plain paths.
    async fn list_roots(&self) -> Result<Vec<String>, ClientRootsError>;
}

/// The ordered, deduplicated set of roots valid for exactly one authorization call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveScope {
    roots: Vec<Root>,
}

impl EffectiveScope {
    pub fn from_roots(roots: impl IntoIterator<Item = Root>) -> Self {
        let mut scope = Self::default();
        for root in roots {
            scope.push(root);
        }
        scope
    }

    /// Append `root` unless an equal root is already present.
    pub fn push(&mut self, root: Root) {
        if !self.roots.contains(&root) {
            self.roots.push(root);
        }
    }

    pub fn roots(&self) -> &[Root] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// True if canonical `path` equals or descends from any root in scope.
    pub fn contains(&self, path: &Path) -> bool {
        self.roots.iter().any(|root| root.contains(path))
    }
}

/// Builds an [`EffectiveScope`] for one request.
#[derive(Debug, Clone)]
pub struct RootResolver {
    timeout: Duration,
}

impl Default for RootResolver {
    fn default() -> Self {
        Self::new(DEFAULT_CLIENT_ROOTS_TIMEOUT)
    }
}

impl RootResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Merge `registry_roots` with whatever the client asserts for this call.
    ///
    /// Without a client, without the capability, or when the round trip fails or
    /// times out, the result is exactly `registry_roots`.
    pub async fn resolve(
        &self,
        registry_roots: Vec<Root>,
        client: Option<&dyn ClientRoots>,
    ) -> EffectiveScope {
        let mut scope = EffectiveScope::from_roots(registry_roots);
        if let Some(client) = client {
            for root in self.fetch_client_roots(client).await {
                scope.push(root);
            }
        }
        scope
    }

    /// Fetch and canonicalize the client's roots.
    ///
    /// Entries that are unparsable, missing or not directories are skipped.
    pub async fn fetch_client_roots(&self, client: &dyn ClientRoots) -> Vec<Root> {
        if !client.supports_roots() {
            tracing::debug!("Client did not negotiate roots capability");
            return Vec::new();
        }

        let uris = match tokio::time::timeout(self.timeout, client.list_roots()).await {
            Ok(Ok(uris)) => uris,
            Ok(Err(e)) => {
                tracing::warn!("Error fetching roots from client: {}", e);
                return Vec::new();
            }
            Err(_) => {
                tracing::warn!(
                    "Client roots request timed out after {:?}, using server roots only",
                    self.timeout
                );
                return Vec::new();
            }
        };

        let roots: Vec<Root> = uris
            .iter()
            .filter_map(|uri| match client_root_from_uri(uri) {
                Ok(root) => Some(root),
                Err(e) => {
                    tracing::warn!("Ignoring client root '{}': {}", uri, e);
                    None
                }
            })
            .collect();

        tracing::debug!("Fetched {} roots from client", roots.len());
        roots
    }
}

/// Convert one client root URI into a canonical client-sourced [`Root`].
pub fn client_root_from_uri(uri: &str) -> Result<Root, RootError> {
    let path = uri_to_path(uri)?;
    Root::from_directory(path, RootSource::Client)
}
