use serde_json::Value;

use crate::notes::NotesService;
use crate::protocol::{ReadBlockParams, ToolError};

/// Handle a `read_block` tool call: fetch one block subtree by id, bounded.
pub async fn handle(params: ReadBlockParams, service: &NotesService) -> Result<Value, ToolError> {
    let outcome = service
        .read_block(&params.document_name, &params.block_id)
        .await;
    super::bounded(outcome, service.limits())
}
