use anyhow::Context;
use clap::Parser;
use rmcp::{
    ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, ErrorData, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_handler, tool_router,
    transport::stdio,
};
use root_scope::{PathAuthorizer, RootRegistry, RootResolver};
use schemars::JsonSchema;
use secure_store::{EncryptionKey, KeyValueStore, SigningKey, StorageMode, select_storage};
use serde::Deserialize;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod client_roots;
mod config;
mod tools;

use client_roots::PeerRoots;
use config::{Cli, Command, Config};

const DEFAULT_LOG_FILTER: &str = "guarded_fs=info,root_scope=info,secure_store=info";

/// Parameters for the AddAllowedRoot tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddAllowedRootParams {
    /// Existing directory to allow
    pub path: String,
}

/// Parameters for the UpdateRoots tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateRootsParams {
    /// Existing directories that replace the server's allowed roots
    #[serde(alias = "newroots")]
    pub paths: Vec<String>,
}

/// Parameters for the RemoveRoot tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RemoveRootParams {
    /// Allowed root to remove
    #[serde(alias = "root")]
    pub path: String,
}

/// Parameters for the CheckPath tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CheckPathParams {
    /// Path to check. Supports ~ and paths relative to the working directory.
    pub path: String,
    /// Expected kind when the path must exist: "file" or "dir"
    #[serde(default)]
    pub expected_kind: Option<String>,
    /// Require the path to exist (default: true). Use false for write targets.
    #[serde(default = "default_must_exist")]
    pub must_exist: bool,
}

fn default_must_exist() -> bool {
    true
}

/// The MCP server state: root authorization plus the session store.
#[derive(Clone)]
pub struct GuardedFsServer {
    authorizer: Arc<PathAuthorizer>,
    store: Arc<dyn KeyValueStore>,
    storage_mode: StorageMode,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl GuardedFsServer {
    pub fn new(
        authorizer: Arc<PathAuthorizer>,
        store: Arc<dyn KeyValueStore>,
        storage_mode: StorageMode,
    ) -> Self {
        Self {
            authorizer,
            store,
            storage_mode,
            tool_router: Self::tool_router(),
        }
    }

    fn registry(&self) -> &RootRegistry {
        self.authorizer.registry()
    }

    #[tool(description = "Get server status: transport, client features (roots, elicitation, sampling), client roots, server roots, denied file types and the session storage backend.")]
    async fn get_server_status(
        &self,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let client = PeerRoots::new(context.peer);
        tools::server_status::execute(
            &self.authorizer,
            Some(&client),
            client.features(),
            self.store.as_ref(),
            self.storage_mode,
        )
        .await
    }

    #[tool(description = "List every directory currently allowed for this request, numbered, marked (Server) for configured roots and (Client) for roots provided by the client.")]
    async fn list_allowed_roots(
        &self,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let client = PeerRoots::new(context.peer);
        tools::manage_roots::list(&self.authorizer, Some(&client)).await
    }

    #[tool(description = "Add an existing directory to the server's allowed roots at runtime.")]
    async fn add_allowed_root(
        &self,
        params: Parameters<AddAllowedRootParams>,
    ) -> Result<CallToolResult, ErrorData> {
        tools::manage_roots::add(self.registry(), &params.0.path)
    }

    #[tool(description = "Replace the server's allowed roots with a list of existing directories. Nothing changes if any entry is invalid or the list is empty.")]
    async fn update_roots(
        &self,
        params: Parameters<UpdateRootsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        tools::manage_roots::update(self.registry(), &params.0.paths)
    }

    #[tool(description = "Remove a single directory from the server's allowed roots.")]
    async fn remove_root(
        &self,
        params: Parameters<RemoveRootParams>,
    ) -> Result<CallToolResult, ErrorData> {
        tools::manage_roots::remove(self.registry(), &params.0.path)
    }

    #[tool(description = "Check whether a path may be accessed. Resolves ~, .. and symlinks, then tests it against the allowed roots and the sensitive file denylist. Returns the canonical path or the reason for denial.")]
    async fn check_path(
        &self,
        params: Parameters<CheckPathParams>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let client = PeerRoots::new(context.peer);
        tools::check_path::execute(
            &self.authorizer,
            Some(&client),
            &params.0.path,
            params.0.expected_kind.as_deref(),
            params.0.must_exist,
        )
        .await
    }
}

#[tool_handler]
impl rmcp::ServerHandler for GuardedFsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "guarded-fs".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(
                "Guarded FS MCP server - every path is checked against the allowed roots (server configured plus client provided) before use."
                    .into(),
            ),
        }
    }
}

/// Print a fresh key pair in env-file form.
fn print_keys() {
    println!("JWT_SIGNING_KEY={}", SigningKey::generate().as_str());
    println!("STORAGE_ENCRYPTION_KEY={}", EncryptionKey::generate().to_base64());
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.command == Some(Command::Keygen) {
        print_keys();
        return Ok(());
    }

    // stdout carries the MCP protocol, so logs go to stderr
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
        .init();

    let config = Config::from(cli);

    let registry = Arc::new(RootRegistry::with_roots(config.static_roots()));
    let authorizer = Arc::new(PathAuthorizer::new(
        registry,
        RootResolver::new(config.roots_timeout),
        config.sensitive_extensions.clone(),
    ));

    let storage = select_storage(&config.storage)
        .await
        .context("Failed to initialize session storage")?;
    tracing::info!("Session storage: {}", storage.mode);

    let server = GuardedFsServer::new(authorizer, storage.store, storage.mode);

    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!("Error starting server: {}", e);
    })?;

    tracing::info!("Guarded FS MCP server started (stdio)");
    service.waiting().await?;

    Ok(())
}
