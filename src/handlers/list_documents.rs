use serde_json::Value;

use crate::notes::NotesService;
use crate::protocol::ToolError;

/// Handle a `list_documents` tool call.
///
/// Takes no arguments; returns the configured name/endpoint pairs and their
/// count, in configuration order.
pub async fn handle(service: &NotesService) -> Result<Value, ToolError> {
    super::bounded(service.list_documents(), service.limits())
}
