use serde::{Deserialize, Serialize};

use super::request::RpcId;

// ---------------------------------------------------------------------------
// JSON-RPC 2.0 response layer
// ---------------------------------------------------------------------------

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RpcId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<RpcId>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<RpcId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// JSON-RPC 2.0 error object (protocol-level errors).
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    pub fn parse_error() -> Self {
        Self { code: -32700, message: "Parse error".into(), data: None }
    }

    pub fn invalid_request() -> Self {
        Self { code: -32600, message: "Invalid Request".into(), data: None }
    }

    pub fn invalid_request_with(detail: impl Into<String>) -> Self {
        Self { code: -32600, message: detail.into(), data: None }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {method}"),
            data: None,
        }
    }

    pub fn invalid_params(detail: impl Into<String>) -> Self {
        Self { code: -32602, message: detail.into(), data: None }
    }

    pub fn internal_error(detail: impl Into<String>) -> Self {
        Self { code: -32603, message: detail.into(), data: None }
    }
}

// ---------------------------------------------------------------------------
// MCP tool result layer (returned inside a *successful* JSON-RPC response)
// ---------------------------------------------------------------------------

/// MCP tool call result wrapper.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub content: Vec<ToolResultContent>,
    #[serde(rename = "isError", skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

/// A single content block inside a tool result.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResultContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

impl ToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolResultContent {
                content_type: "text".into(),
                text: text.into(),
            }],
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolResultContent {
                content_type: "text".into(),
                text: text.into(),
            }],
            is_error: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Tool-level error types
// ---------------------------------------------------------------------------

/// Tool error code.
///
/// These cover the per-call recoverable failures: malformed arguments and
/// unknown tool names. Upstream and lookup failures are not tool errors —
/// they are embedded in the result payload so the batch they belong to can
/// keep its shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorCode {
    InvalidArguments,
    UnknownTool,
    InternalError,
}

impl ToolErrorCode {
    /// Map to the corresponding JSON-RPC 2.0 error code.
    pub fn json_rpc_code(&self) -> i32 {
        match self {
            Self::InvalidArguments => -32602,
            Self::UnknownTool => -32601,
            Self::InternalError => -32603,
        }
    }
}

/// Structured tool-level error, serialized as `{"error": {code, message}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolError {
    pub code: ToolErrorCode,
    pub message: String,
}

impl ToolError {
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self {
            code: ToolErrorCode::InvalidArguments,
            message: message.into(),
        }
    }

    pub fn unknown_tool(name: &str) -> Self {
        Self {
            code: ToolErrorCode::UnknownTool,
            message: format!("Unknown tool: {name}"),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: ToolErrorCode::InternalError,
            message: message.into(),
        }
    }

    /// The top-level envelope shape, shared by every transport.
    pub fn to_envelope(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.code,
                "message": self.message,
            }
        })
    }
}

/// Convert a tool error into a JSON-RPC error.
///
/// The JSON-RPC `code` is derived from the tool error code. The full
/// envelope is carried in `data` for structured clients.
impl From<ToolError> for JsonRpcError {
    fn from(err: ToolError) -> Self {
        Self {
            code: err.code.json_rpc_code(),
            message: err.message.clone(),
            data: Some(err.to_envelope()),
        }
    }
}

/// Convert a tool error into a tool result with `isError: true`.
///
/// The text content is the JSON-serialized envelope, preserving the
/// structured error for clients that inspect tool output.
impl From<ToolError> for ToolResult {
    fn from(err: ToolError) -> Self {
        let json = serde_json::to_string(&err.to_envelope())
            .expect("tool error envelope must serialize to JSON string");
        Self::error(format!("{json}\n"))
    }
}
