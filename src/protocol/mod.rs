pub mod request;
pub mod response;

pub use request::{
    InitializeParams, JsonRpcRequest, ReadBlockParams, ReadDocumentParams, RpcId,
    SearchAllNotesParams, SearchDocumentParams, ToolCallParams,
};
pub use response::{
    JsonRpcError, JsonRpcResponse, ToolError, ToolErrorCode, ToolResult, ToolResultContent,
};
