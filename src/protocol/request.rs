use serde::{Deserialize, Serialize};

/// JSON-RPC 2.0 ID — may be a number or string per spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcId {
    Number(i64),
    Str(String),
}

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<RpcId>,
    pub method: String,
    pub params: Option<serde_json::Value>,
}

/// Parameters for the `search_all_notes` tool.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchAllNotesParams {
    pub query: String,
    #[serde(rename = "caseSensitive", default)]
    pub case_sensitive: bool,
}

/// Parameters for the `search_document` tool.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchDocumentParams {
    #[serde(rename = "documentName")]
    pub document_name: String,
    pub query: String,
    #[serde(rename = "caseSensitive", default)]
    pub case_sensitive: bool,
}

/// Parameters for the `read_document` tool.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadDocumentParams {
    #[serde(rename = "documentName")]
    pub document_name: String,
    #[serde(rename = "maxDepth")]
    pub max_depth: Option<u32>,
}

/// Parameters for the `read_block` tool.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadBlockParams {
    #[serde(rename = "documentName")]
    pub document_name: String,
    #[serde(rename = "blockId")]
    pub block_id: String,
}

/// MCP `initialize` params.
#[derive(Debug, Clone, Deserialize)]
pub struct InitializeParams {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: Option<String>,
    #[serde(rename = "clientInfo")]
    pub client_info: Option<ClientInfo>,
}

/// Client information sent during `initialize`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientInfo {
    pub name: Option<String>,
    pub version: Option<String>,
}

/// Parameters for `tools/call`.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    pub arguments: Option<serde_json::Value>,
}
