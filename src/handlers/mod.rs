pub mod health;
pub mod list_documents;
pub mod read_block;
pub mod read_document;
pub mod search_all_notes;
pub mod search_document;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::bound;
use crate::notes::{NotesService, ResponseLimits};
use crate::protocol::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, ReadBlockParams, ReadDocumentParams,
    SearchAllNotesParams, SearchDocumentParams, ToolCallParams, ToolError, ToolResult,
};

/// Dispatch a JSON-RPC request to the appropriate handler.
///
/// Returns `None` for notifications (no response required).
pub async fn dispatch(req: &JsonRpcRequest, service: &NotesService) -> Option<JsonRpcResponse> {
    match req.method.as_str() {
        "initialize" => {
            let result = serde_json::json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": "mcp-notes-server",
                    "version": env!("CARGO_PKG_VERSION")
                }
            });
            Some(JsonRpcResponse::success(req.id.clone(), result))
        }

        "notifications/initialized" => None,

        "ping" => Some(JsonRpcResponse::success(req.id.clone(), serde_json::json!({}))),

        "tools/list" => Some(JsonRpcResponse::success(
            req.id.clone(),
            serde_json::json!({ "tools": tool_definitions() }),
        )),

        "tools/call" => {
            let params: ToolCallParams = match &req.params {
                Some(v) => match serde_json::from_value(v.clone()) {
                    Ok(p) => p,
                    Err(e) => {
                        return Some(JsonRpcResponse::error(
                            req.id.clone(),
                            JsonRpcError::invalid_params(format!(
                                "Invalid tools/call params: {e}"
                            )),
                        ));
                    }
                },
                None => {
                    return Some(JsonRpcResponse::error(
                        req.id.clone(),
                        JsonRpcError::invalid_params("Missing params for tools/call"),
                    ));
                }
            };

            let tool_result = dispatch_tool_call(&params, service).await;
            let result_json = serde_json::to_value(&tool_result)
                .expect("ToolResult must serialize to JSON Value");
            Some(JsonRpcResponse::success(req.id.clone(), result_json))
        }

        _ => Some(JsonRpcResponse::error(
            req.id.clone(),
            JsonRpcError::method_not_found(&req.method),
        )),
    }
}

/// Run a tool call and wrap the outcome into an MCP tool result.
pub async fn dispatch_tool_call(params: &ToolCallParams, service: &NotesService) -> ToolResult {
    match call_tool(&params.name, params.arguments.as_ref(), service).await {
        Ok(value) => {
            let json = serde_json::to_string(&value)
                .expect("tool result must serialize to JSON string");
            ToolResult::text(format!("{json}\n"))
        }
        Err(err) => err.into(),
    }
}

/// Route a named tool call to its handler.
///
/// This is the single tool-surface entry point: the stdio and SSE transports
/// reach it through [`dispatch`], the REST facade calls it directly.
pub async fn call_tool(
    name: &str,
    arguments: Option<&Value>,
    service: &NotesService,
) -> Result<Value, ToolError> {
    match name {
        "list_documents" => list_documents::handle(service).await,

        "search_all_notes" => {
            let params: SearchAllNotesParams = parse_args(name, arguments)?;
            search_all_notes::handle(params, service).await
        }

        "search_document" => {
            let params: SearchDocumentParams = parse_args(name, arguments)?;
            search_document::handle(params, service).await
        }

        "read_document" => {
            let params: ReadDocumentParams = parse_args(name, arguments)?;
            read_document::handle(params, service).await
        }

        "read_block" => {
            let params: ReadBlockParams = parse_args(name, arguments)?;
            read_block::handle(params, service).await
        }

        "health" => health::handle(service).await,

        _ => Err(ToolError::unknown_tool(name)),
    }
}

/// The advertised tool list. Input schemas mirror the typed param structs in
/// `protocol::request` exactly; the schema harness test keeps them honest.
pub fn tool_definitions() -> Value {
    serde_json::json!([
        {
            "name": "list_documents",
            "description": "List all configured note documents and their API endpoints",
            "inputSchema": {
                "type": "object",
                "properties": {}
            }
        },
        {
            "name": "search_all_notes",
            "description": "Search every configured document for blocks matching a pattern",
            "inputSchema": {
                "type": "object",
                "required": ["query"],
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search pattern to match against block content"
                    },
                    "caseSensitive": {
                        "type": "boolean",
                        "description": "Match case-sensitively (default false)"
                    }
                }
            }
        },
        {
            "name": "search_document",
            "description": "Search a single named document for blocks matching a pattern",
            "inputSchema": {
                "type": "object",
                "required": ["documentName", "query"],
                "properties": {
                    "documentName": {
                        "type": "string",
                        "description": "Configured document name"
                    },
                    "query": {
                        "type": "string",
                        "description": "Search pattern to match against block content"
                    },
                    "caseSensitive": {
                        "type": "boolean",
                        "description": "Match case-sensitively (default false)"
                    }
                }
            }
        },
        {
            "name": "read_document",
            "description": "Read a document's full block tree from its root",
            "inputSchema": {
                "type": "object",
                "required": ["documentName"],
                "properties": {
                    "documentName": {
                        "type": "string",
                        "description": "Configured document name"
                    },
                    "maxDepth": {
                        "type": "integer",
                        "description": "Maximum depth of returned child blocks",
                        "minimum": 0
                    }
                }
            }
        },
        {
            "name": "read_block",
            "description": "Read a single block subtree by its id",
            "inputSchema": {
                "type": "object",
                "required": ["documentName", "blockId"],
                "properties": {
                    "documentName": {
                        "type": "string",
                        "description": "Configured document name"
                    },
                    "blockId": {
                        "type": "string",
                        "description": "Block identifier within the document"
                    }
                }
            }
        }
    ])
}

/// Deserialize tool arguments, converting failures into a structured
/// invalid-arguments error naming the violated field.
fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Option<&Value>) -> Result<T, ToolError> {
    match arguments {
        Some(v) => serde_json::from_value(v.clone()).map_err(|e| {
            ToolError::invalid_arguments(format!("Invalid arguments for {tool}: {e}"))
        }),
        None => Err(ToolError::invalid_arguments(format!(
            "Missing arguments for {tool}"
        ))),
    }
}

/// Serialize a handler payload and pass it through the response bounder.
fn bounded(payload: impl Serialize, limits: &ResponseLimits) -> Result<Value, ToolError> {
    let value = serde_json::to_value(payload)
        .map_err(|e| ToolError::internal(format!("Serialization failed: {e}")))?;
    Ok(bound::bound(value, limits.max_bytes, &limits.policy).data)
}
