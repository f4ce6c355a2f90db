//! REST facade for stateless hosting.
//!
//! A plain HTTP surface over the same tool dispatch as the MCP transports:
//! `POST /tools/call` mirrors the MCP call shape, and the path-style routes
//! map one-to-one onto the five tools for clients that prefer URLs over
//! envelopes. No connection state; every request is independent.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::handlers;
use crate::notes::NotesService;

/// Serve the REST facade on `bind` until ctrl-c.
pub async fn serve(
    service: Arc<NotesService>,
    bind: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let router = router(service);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(%bind, "REST facade listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}

/// Build the facade router. Separated from [`serve`] so tests can bind it
/// to an ephemeral port.
pub fn router(service: Arc<NotesService>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tools", get(list_tools))
        .route("/tools/call", post(call))
        .route("/documents", get(documents))
        .route("/search", get(search_all))
        .route("/search/{doc}", get(search_one))
        .route("/document/{doc}", get(read_document))
        .route("/document/{doc}/block/{id}", get(read_block))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
struct ToolCallBody {
    name: String,
    arguments: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: Option<String>,
    #[serde(rename = "caseSensitive")]
    case_sensitive: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ReadDocumentQuery {
    #[serde(rename = "maxDepth")]
    max_depth: Option<u32>,
}

async fn health(State(service): State<Arc<NotesService>>) -> (StatusCode, Json<Value>) {
    respond("health", None, &service).await
}

async fn list_tools() -> Json<Value> {
    Json(json!({ "tools": handlers::tool_definitions() }))
}

async fn call(
    State(service): State<Arc<NotesService>>,
    Json(body): Json<ToolCallBody>,
) -> (StatusCode, Json<Value>) {
    respond(&body.name, body.arguments, &service).await
}

async fn documents(State(service): State<Arc<NotesService>>) -> (StatusCode, Json<Value>) {
    respond("list_documents", Some(json!({})), &service).await
}

async fn search_all(
    State(service): State<Arc<NotesService>>,
    Query(params): Query<SearchParams>,
) -> (StatusCode, Json<Value>) {
    let args = search_args(None, params);
    respond("search_all_notes", Some(args), &service).await
}

async fn search_one(
    State(service): State<Arc<NotesService>>,
    Path(doc): Path<String>,
    Query(params): Query<SearchParams>,
) -> (StatusCode, Json<Value>) {
    let args = search_args(Some(doc), params);
    respond("search_document", Some(args), &service).await
}

async fn read_document(
    State(service): State<Arc<NotesService>>,
    Path(doc): Path<String>,
    Query(params): Query<ReadDocumentQuery>,
) -> (StatusCode, Json<Value>) {
    let mut args = Map::new();
    args.insert("documentName".into(), Value::String(doc));
    if let Some(depth) = params.max_depth {
        args.insert("maxDepth".into(), json!(depth));
    }
    respond("read_document", Some(Value::Object(args)), &service).await
}

async fn read_block(
    State(service): State<Arc<NotesService>>,
    Path((doc, id)): Path<(String, String)>,
) -> (StatusCode, Json<Value>) {
    let args = json!({ "documentName": doc, "blockId": id });
    respond("read_block", Some(args), &service).await
}

/// Assemble search arguments, inserting only the fields the caller supplied
/// so a missing `query` surfaces as the usual invalid-arguments error.
fn search_args(document_name: Option<String>, params: SearchParams) -> Value {
    let mut args = Map::new();
    if let Some(doc) = document_name {
        args.insert("documentName".into(), Value::String(doc));
    }
    if let Some(query) = params.query {
        args.insert("query".into(), Value::String(query));
    }
    if let Some(case_sensitive) = params.case_sensitive {
        args.insert("caseSensitive".into(), Value::Bool(case_sensitive));
    }
    Value::Object(args)
}

async fn respond(
    name: &str,
    arguments: Option<Value>,
    service: &NotesService,
) -> (StatusCode, Json<Value>) {
    match handlers::call_tool(name, arguments.as_ref(), service).await {
        Ok(result) => (
            StatusCode::OK,
            Json(json!({ "success": true, "result": result })),
        ),
        Err(err) => (StatusCode::BAD_REQUEST, Json(err.to_envelope())),
    }
}
