//! CheckPath tool - runs a path through the authorizer and reports the outcome.
//!
//! This is the single call every file operation makes before touching the
//! filesystem, exposed directly so a client can see what it would be allowed.

use rmcp::model::{CallToolResult, Content, ErrorData};
use root_scope::{AuthorizationRequest, ClientRoots, ExpectedKind, PathAuthorizer};
use serde::Serialize;

use super::{json_result, to_json};

#[derive(Debug, Serialize)]
struct Allowed {
    allowed: bool,
    path: String,
}

#[derive(Debug, Serialize)]
struct Denied {
    allowed: bool,
    kind: &'static str,
    reason: String,
}

/// Execute the CheckPath tool.
pub async fn execute(
    authorizer: &PathAuthorizer,
    client: Option<&dyn ClientRoots>,
    path: &str,
    expected_kind: Option<&str>,
    must_exist: bool,
) -> Result<CallToolResult, ErrorData> {
    let expected_kind = expected_kind
        .filter(|kind| !kind.trim().is_empty())
        .map(str::parse::<ExpectedKind>)
        .transpose()
        .map_err(|e| ErrorData::invalid_params(e, None))?;

    let request = AuthorizationRequest::new(path, expected_kind, must_exist);
    match authorizer.validate(&request, client).await {
        Ok(canonical) => json_result(&Allowed {
            allowed: true,
            path: canonical.display().to_string(),
        }),
        Err(denial) => {
            let response = Denied {
                allowed: false,
                kind: denial.kind().as_str(),
                reason: denial.to_string(),
            };
            Ok(CallToolResult::error(vec![Content::text(to_json(&response)?)]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::result_text;
    use root_scope::{Root, RootRegistry, RootResolver, RootSource, SensitiveExtensions};
    use serde_json::Value;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn create_test_env() -> (TempDir, PathAuthorizer) {
        let temp_dir = TempDir::new().unwrap();
        let root = Root::from_directory(temp_dir.path(), RootSource::Static).unwrap();
        let registry = Arc::new(RootRegistry::with_roots([root]));
        let authorizer =
            PathAuthorizer::new(registry, RootResolver::default(), SensitiveExtensions::default());
        (temp_dir, authorizer)
    }

    fn parse(result: &CallToolResult) -> Value {
        serde_json::from_str(&result_text(result)).unwrap()
    }

    #[tokio::test]
    async fn test_allowed_path_reports_canonical_form() {
        let (temp_dir, authorizer) = create_test_env();
        std::fs::create_dir(temp_dir.path().join("docs")).unwrap();
        std::fs::write(temp_dir.path().join("docs/readme.md"), "hi").unwrap();

        let raw = temp_dir.path().join("docs/../docs/readme.md");
        let result = execute(&authorizer, None, raw.to_str().unwrap(), Some("file"), true)
            .await
            .unwrap();

        assert_ne!(result.is_error, Some(true));
        let json = parse(&result);
        assert_eq!(json["allowed"], true);
        let expected = temp_dir.path().canonicalize().unwrap().join("docs/readme.md");
        assert_eq!(json["path"], expected.display().to_string());
    }

    #[tokio::test]
    async fn test_denial_is_reported_with_kind() {
        let (temp_dir, authorizer) = create_test_env();

        let outside = execute(&authorizer, None, "/etc/passwd", None, false).await.unwrap();
        assert_eq!(outside.is_error, Some(true));
        assert_eq!(parse(&outside)["kind"], "outside_allowed_roots");

        let key = temp_dir.path().join("server.pem");
        let sensitive = execute(&authorizer, None, key.to_str().unwrap(), None, false)
            .await
            .unwrap();
        assert_eq!(parse(&sensitive)["kind"], "sensitive_extension");

        let missing = temp_dir.path().join("missing.txt");
        let not_found = execute(&authorizer, None, missing.to_str().unwrap(), None, true)
            .await
            .unwrap();
        assert_eq!(parse(&not_found)["kind"], "path_not_found");
    }

    #[tokio::test]
    async fn test_wrong_kind() {
        let (temp_dir, authorizer) = create_test_env();
        let dir = temp_dir.path().to_str().unwrap();
        let result = execute(&authorizer, None, dir, Some("file"), true).await.unwrap();
        assert_eq!(parse(&result)["kind"], "wrong_type");
    }

    #[tokio::test]
    async fn test_unknown_kind_is_invalid_params() {
        let (temp_dir, authorizer) = create_test_env();
        let dir = temp_dir.path().to_str().unwrap();
        let result = execute(&authorizer, None, dir, Some("socket"), true).await;
        assert!(result.is_err());
    }
}
