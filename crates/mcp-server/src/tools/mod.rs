//! Tool implementations. Each module exposes an `execute` taking the pieces of
//! server state it needs, so the tools can be tested without an MCP session.

pub mod check_path;
pub mod manage_roots;
pub mod server_status;

use rmcp::model::{CallToolResult, Content, ErrorData};
use serde::Serialize;

pub(crate) fn to_json<T: Serialize>(response: &T) -> Result<String, ErrorData> {
    serde_json::to_string(response).map_err(|e| {
        ErrorData::internal_error(format!("Failed to serialize response: {}", e), None)
    })
}

/// Serialize `response` as the tool's single text content.
pub(crate) fn json_result<T: Serialize>(response: &T) -> Result<CallToolResult, ErrorData> {
    Ok(CallToolResult::success(vec![Content::text(to_json(response)?)]))
}

/// A refusal reported to the caller as tool output rather than a protocol error.
pub(crate) fn tool_error(message: impl Into<String>) -> CallToolResult {
    CallToolResult::error(vec![Content::text(message.into())])
}

#[cfg(test)]
pub(crate) fn result_text(result: &CallToolResult) -> String {
    result.content[0]
        .raw
        .as_text()
        .expect("Expected text")
        .text
        .clone()
}
