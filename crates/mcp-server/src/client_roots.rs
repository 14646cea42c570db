//! Client roots over the MCP session.

use async_trait::async_trait;
use rmcp::service::{Peer, RoleServer};
use root_scope::{ClientRoots, ClientRootsError};

use crate::tools::server_status::ClientFeatures;

/// The connected client, asked for its roots through `roots/list`.
pub struct PeerRoots {
    peer: Peer<RoleServer>,
}

impl PeerRoots {
    pub fn new(peer: Peer<RoleServer>) -> Self {
        Self { peer }
    }

    /// Capabilities the client declared during initialization.
    pub fn features(&self) -> ClientFeatures {
        self.peer
            .peer_info()
            .map(|info| ClientFeatures::from(&info.capabilities))
            .unwrap_or_default()
    }
}

#[async_trait]
impl ClientRoots for PeerRoots {
    fn supports_roots(&self) -> bool {
        self.peer
            .peer_info()
            .is_some_and(|info| info.capabilities.roots.is_some())
    }

    async fn list_roots(&self) -> Result<Vec<String>, ClientRootsError> {
        let result = self
            .peer
            .list_roots()
            .await
            .map_err(|e| ClientRootsError::Request(e.to_string()))?;
        Ok(result.roots.into_iter().map(|root| root.uri).collect())
    }
}
