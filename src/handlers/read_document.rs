use serde_json::Value;

use crate::notes::NotesService;
use crate::protocol::{ReadDocumentParams, ToolError};

/// Handle a `read_document` tool call: fetch the document root, bounded.
pub async fn handle(
    params: ReadDocumentParams,
    service: &NotesService,
) -> Result<Value, ToolError> {
    let outcome = service
        .read_document(&params.document_name, params.max_depth)
        .await;
    super::bounded(outcome, service.limits())
}
