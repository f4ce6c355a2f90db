use serde_json::Value;

use crate::notes::NotesService;
use crate::protocol::{SearchAllNotesParams, ToolError};

/// Handle a `search_all_notes` tool call.
///
/// Fans the search out across every configured document; per-document
/// failures come back as `error` entries inside the aggregated payload, so
/// this handler itself only fails on serialization.
pub async fn handle(
    params: SearchAllNotesParams,
    service: &NotesService,
) -> Result<Value, ToolError> {
    let response = service
        .search_all_notes(&params.query, params.case_sensitive)
        .await;
    super::bounded(response, service.limits())
}
