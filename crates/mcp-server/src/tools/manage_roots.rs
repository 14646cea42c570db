//! Root management tools: list the effective scope and mutate the registry.
//!
//! Mutations only touch server-side roots. Client roots are never written back
//! into the registry; they are merged per request by the resolver.

use rmcp::model::{CallToolResult, Content, ErrorData};
use root_scope::{ClientRoots, PathAuthorizer, RootRegistry};

use super::tool_error;

/// Execute the ListAllowedRoots tool.
pub async fn list(
    authorizer: &PathAuthorizer,
    client: Option<&dyn ClientRoots>,
) -> Result<CallToolResult, ErrorData> {
    let scope = authorizer.scope(client).await;

    if scope.is_empty() {
        return Ok(CallToolResult::success(vec![Content::text("No allowed roots configured.")]));
    }

    let mut lines = vec!["Allowed Root Directories:".to_string()];
    for (i, root) in scope.roots().iter().enumerate() {
        lines.push(format!("{}. {} ({})", i + 1, root, root.source().label()));
    }

    Ok(CallToolResult::success(vec![Content::text(lines.join("\n"))]))
}

/// Execute the AddAllowedRoot tool.
pub fn add(registry: &RootRegistry, path: &str) -> Result<CallToolResult, ErrorData> {
    let message = match registry.add_path(path) {
        Ok((root, true)) => format!("Successfully added '{}' to allowed roots.", root),
        Ok((root, false)) => format!("Path '{}' is already in allowed roots.", root),
        Err(e) => return Ok(tool_error(format!("Error: {}", e))),
    };
    Ok(CallToolResult::success(vec![Content::text(message)]))
}

/// Execute the UpdateRoots tool. All-or-nothing.
pub fn update(registry: &RootRegistry, paths: &[String]) -> Result<CallToolResult, ErrorData> {
    match registry.replace_paths(paths) {
        Ok(count) => Ok(CallToolResult::success(vec![Content::text(format!(
            "Updated allowed roots to {} directories",
            count
        ))])),
        Err(e) => Ok(tool_error(format!("Error: {}", e))),
    }
}

/// Execute the RemoveRoot tool.
pub fn remove(registry: &RootRegistry, path: &str) -> Result<CallToolResult, ErrorData> {
    match registry.remove_path(path) {
        Ok(root) => Ok(CallToolResult::success(vec![Content::text(format!(
            "Removed root '{}'",
            root
        ))])),
        Err(e) => Ok(tool_error(format!("Error: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::result_text;
    use async_trait::async_trait;
    use root_scope::{ClientRootsError, Root, RootResolver, RootSource, SensitiveExtensions};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct FixedRoots(Vec<String>);

    #[async_trait]
    impl ClientRoots for FixedRoots {
        fn supports_roots(&self) -> bool {
            true
        }

        async fn list_roots(&self) -> Result<Vec<String>, ClientRootsError> {
            Ok(self.0.clone())
        }
    }

    fn authorizer_with(registry: Arc<RootRegistry>) -> PathAuthorizer {
        PathAuthorizer::new(registry, RootResolver::default(), SensitiveExtensions::default())
    }

    #[tokio::test]
    async fn test_list_empty() {
        let authorizer = authorizer_with(Arc::new(RootRegistry::new()));
        let result = list(&authorizer, None).await.unwrap();
        assert_eq!(result_text(&result), "No allowed roots configured.");
    }

    #[tokio::test]
    async fn test_list_labels_sources() {
        let server_dir = TempDir::new().unwrap();
        let client_dir = TempDir::new().unwrap();
        let registry = Arc::new(RootRegistry::with_roots([
            Root::from_directory(server_dir.path(), RootSource::Static).unwrap(),
        ]));
        let authorizer = authorizer_with(registry);
        let client = FixedRoots(vec![client_dir.path().display().to_string()]);

        let text = result_text(&list(&authorizer, Some(&client)).await.unwrap());
        let server = server_dir.path().canonicalize().unwrap();
        let client_path = client_dir.path().canonicalize().unwrap();
        assert_eq!(
            text,
            format!(
                "Allowed Root Directories:\n1. {} (Server)\n2. {} (Client)",
                server.display(),
                client_path.display()
            )
        );
    }

    #[test]
    fn test_add_twice_reports_existing() {
        let dir = TempDir::new().unwrap();
        let registry = RootRegistry::new();
        let path = dir.path().to_str().unwrap();

        let first = result_text(&add(&registry, path).unwrap());
        assert!(first.starts_with("Successfully added"));
        let second = result_text(&add(&registry, path).unwrap());
        assert!(second.contains("already in allowed roots"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_add_rejects_files_and_missing_paths() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();
        let registry = RootRegistry::new();

        let result = add(&registry, file.to_str().unwrap()).unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(result_text(&result).contains("is not a directory"));

        let result = add(&registry, "/no/such/dir").unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_update_is_all_or_nothing() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let registry = RootRegistry::new();
        registry.add_path(a.path()).unwrap();

        let bad = vec![b.path().display().to_string(), "/no/such/dir".to_string()];
        let result = update(&registry, &bad).unwrap();
        assert_eq!(result.is_error, Some(true));
        assert_eq!(registry.snapshot()[0].path(), a.path().canonicalize().unwrap());

        let good = vec![b.path().display().to_string()];
        let result = update(&registry, &good).unwrap();
        assert_eq!(result_text(&result), "Updated allowed roots to 1 directories");
        assert_eq!(registry.snapshot()[0].path(), b.path().canonicalize().unwrap());

        let result = update(&registry, &[]).unwrap();
        assert_eq!(result_text(&result), "Error: No valid directories provided");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let registry = RootRegistry::new();
        registry.add_path(a.path()).unwrap();

        let result = remove(&registry, b.path().to_str().unwrap()).unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(result_text(&result).contains("not found in allowed roots"));
        assert_eq!(registry.len(), 1);

        let result = remove(&registry, a.path().to_str().unwrap()).unwrap();
        assert!(result_text(&result).starts_with("Removed root"));
        assert!(registry.is_empty());
    }
}
