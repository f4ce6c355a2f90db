use serde_json::Value;

use crate::notes::NotesService;
use crate::protocol::{SearchDocumentParams, ToolError};

/// Handle a `search_document` tool call.
///
/// An unknown document name is a soft error: the payload carries `error`
/// plus `availableDocuments` so the caller can discover valid names.
pub async fn handle(
    params: SearchDocumentParams,
    service: &NotesService,
) -> Result<Value, ToolError> {
    let outcome = service
        .search_document(&params.document_name, &params.query, params.case_sensitive)
        .await;
    super::bounded(outcome, service.limits())
}
