use serde_json::Value;

use crate::notes::NotesService;
use crate::protocol::ToolError;

/// Health check. Not advertised in `tools/list`; also backs `GET /health`
/// on the REST facade.
pub async fn handle(service: &NotesService) -> Result<Value, ToolError> {
    Ok(serde_json::json!({
        "status": "ok",
        "documents": service.document_count(),
    }))
}
