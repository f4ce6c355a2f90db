//! Integration tests for JSON-RPC dispatch and the tool surface.
//!
//! Tests drive `handlers::dispatch` directly with a test NotesService and
//! verify the full tools/call flow, including argument validation errors.

use std::time::Duration;

use mcp_notes_server::bound::TruncationPolicy;
use mcp_notes_server::config::{DocumentConfig, ServerConfig};
use mcp_notes_server::handlers;
use mcp_notes_server::notes::NotesService;
use mcp_notes_server::protocol::{JsonRpcRequest, RpcId};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_service(endpoints: Vec<(&str, String)>) -> NotesService {
    let documents = endpoints
        .into_iter()
        .map(|(name, api_endpoint)| DocumentConfig {
            name: name.to_string(),
            api_endpoint,
        })
        .collect();
    let config = ServerConfig {
        documents,
        upstream_timeout: Duration::from_secs(5),
        max_response_bytes: 1024 * 1024,
        truncation: TruncationPolicy::default(),
    };
    NotesService::from_config(&config).expect("client build cannot fail")
}

fn request(id: i64, method: &str, params: Option<Value>) -> JsonRpcRequest {
    JsonRpcRequest {
        jsonrpc: "2.0".into(),
        id: Some(RpcId::Number(id)),
        method: method.into(),
        params,
    }
}

/// Parse the JSON text content out of a tools/call response.
fn tool_text(result: &Value) -> Value {
    let text = result["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

// ---------------------------------------------------------------------------
// Protocol methods
// ---------------------------------------------------------------------------

#[tokio::test]
async fn initialize_reports_server_info() {
    let service = test_service(vec![("A", "http://127.0.0.1:9".into())]);
    let req = request(1, "initialize", Some(json!({"protocolVersion": "2024-11-05"})));

    let response = handlers::dispatch(&req, &service).await.unwrap();
    let result = response.result.unwrap();

    assert_eq!(result["serverInfo"]["name"], json!("mcp-notes-server"));
    assert!(result["capabilities"]["tools"].is_object());
}

#[tokio::test]
async fn initialized_notification_gets_no_response() {
    let service = test_service(vec![("A", "http://127.0.0.1:9".into())]);
    let req = JsonRpcRequest {
        jsonrpc: "2.0".into(),
        id: None,
        method: "notifications/initialized".into(),
        params: None,
    };

    assert!(handlers::dispatch(&req, &service).await.is_none());
}

#[tokio::test]
async fn unknown_method_is_method_not_found() {
    let service = test_service(vec![("A", "http://127.0.0.1:9".into())]);
    let req = request(2, "resources/list", None);

    let response = handlers::dispatch(&req, &service).await.unwrap();
    let error = response.error.unwrap();
    assert_eq!(error.code, -32601);
}

#[tokio::test]
async fn tools_list_advertises_all_five_tools() {
    let service = test_service(vec![("A", "http://127.0.0.1:9".into())]);
    let req = request(3, "tools/list", None);

    let response = handlers::dispatch(&req, &service).await.unwrap();
    let result = response.result.unwrap();
    let tools = result["tools"].as_array().unwrap();

    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    for expected in [
        "list_documents",
        "search_all_notes",
        "search_document",
        "read_document",
        "read_block",
    ] {
        assert!(names.contains(&expected), "missing tool {expected}");
    }
    assert_eq!(tools.len(), 5, "exactly five tools are advertised");

    for tool in tools {
        assert!(tool["inputSchema"]["type"] == json!("object"));
        assert!(tool["description"].as_str().unwrap().len() > 0);
    }
}

// ---------------------------------------------------------------------------
// tools/call
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_documents_via_tools_call() {
    let service = test_service(vec![
        ("Work", "http://work.example/api".into()),
        ("Personal", "http://personal.example/api".into()),
    ]);
    let req = request(
        4,
        "tools/call",
        Some(json!({"name": "list_documents", "arguments": {}})),
    );

    let response = handlers::dispatch(&req, &service).await.unwrap();
    let result = response.result.unwrap();
    assert!(result.get("isError").is_none());

    let payload = tool_text(&result);
    assert_eq!(payload["count"], json!(2));
    assert_eq!(payload["documents"][0]["name"], json!("Work"));
    assert_eq!(
        payload["documents"][0]["apiEndpoint"],
        json!("http://work.example/api")
    );
    assert_eq!(payload["documents"][1]["name"], json!("Personal"));
}

#[tokio::test]
async fn search_all_notes_via_tools_call() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blocks/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "b1", "content": "hello world"},
        ])))
        .mount(&upstream)
        .await;

    let service = test_service(vec![("Notes", upstream.uri())]);
    let req = request(
        5,
        "tools/call",
        Some(json!({"name": "search_all_notes", "arguments": {"query": "hello"}})),
    );

    let response = handlers::dispatch(&req, &service).await.unwrap();
    let payload = tool_text(&response.result.unwrap());

    assert_eq!(payload["query"], json!("hello"));
    assert_eq!(payload["caseSensitive"], json!(false));
    assert_eq!(payload["totalResults"], json!(1));
    assert_eq!(payload["documentsSearched"], json!(1));
}

#[tokio::test]
async fn missing_required_field_names_the_field() {
    let service = test_service(vec![("A", "http://127.0.0.1:9".into())]);
    let req = request(
        6,
        "tools/call",
        Some(json!({"name": "search_document", "arguments": {"query": "x"}})),
    );

    let response = handlers::dispatch(&req, &service).await.unwrap();
    let result = response.result.unwrap();
    assert_eq!(result["isError"], json!(true));

    let payload = tool_text(&result);
    assert_eq!(payload["error"]["code"], json!("invalid_arguments"));
    assert!(
        payload["error"]["message"].as_str().unwrap().contains("documentName"),
        "validation error must identify the violated field"
    );
}

#[tokio::test]
async fn wrong_argument_type_is_a_tool_error() {
    let service = test_service(vec![("A", "http://127.0.0.1:9".into())]);
    let req = request(
        7,
        "tools/call",
        Some(json!({
            "name": "read_document",
            "arguments": {"documentName": 42}
        })),
    );

    let response = handlers::dispatch(&req, &service).await.unwrap();
    let result = response.result.unwrap();
    assert_eq!(result["isError"], json!(true));

    let payload = tool_text(&result);
    assert_eq!(payload["error"]["code"], json!("invalid_arguments"));
}

#[tokio::test]
async fn missing_arguments_object_is_a_tool_error() {
    let service = test_service(vec![("A", "http://127.0.0.1:9".into())]);
    let req = request(
        8,
        "tools/call",
        Some(json!({"name": "read_block"})),
    );

    let response = handlers::dispatch(&req, &service).await.unwrap();
    let result = response.result.unwrap();
    assert_eq!(result["isError"], json!(true));

    let payload = tool_text(&result);
    assert_eq!(payload["error"]["code"], json!("invalid_arguments"));
    assert!(payload["error"]["message"].as_str().unwrap().contains("read_block"));
}

#[tokio::test]
async fn unknown_tool_is_a_tool_error() {
    let service = test_service(vec![("A", "http://127.0.0.1:9".into())]);
    let req = request(
        9,
        "tools/call",
        Some(json!({"name": "delete_document", "arguments": {}})),
    );

    let response = handlers::dispatch(&req, &service).await.unwrap();
    let result = response.result.unwrap();
    assert_eq!(result["isError"], json!(true));

    let payload = tool_text(&result);
    assert_eq!(payload["error"]["code"], json!("unknown_tool"));
}

#[tokio::test]
async fn tools_call_without_params_is_invalid_params() {
    let service = test_service(vec![("A", "http://127.0.0.1:9".into())]);
    let req = request(10, "tools/call", None);

    let response = handlers::dispatch(&req, &service).await.unwrap();
    let error = response.error.unwrap();
    assert_eq!(error.code, -32602);
}

#[tokio::test]
async fn unknown_document_via_tools_call_is_soft() {
    let service = test_service(vec![
        ("Work", "http://127.0.0.1:9".into()),
        ("Personal", "http://127.0.0.1:9".into()),
    ]);
    let req = request(
        11,
        "tools/call",
        Some(json!({
            "name": "search_document",
            "arguments": {"documentName": "Archive", "query": "x"}
        })),
    );

    let response = handlers::dispatch(&req, &service).await.unwrap();
    let result = response.result.unwrap();
    assert!(result.get("isError").is_none(), "lookup misses are soft, not tool errors");

    let payload = tool_text(&result);
    assert!(payload["error"].as_str().unwrap().contains("Archive"));
    assert_eq!(payload["availableDocuments"], json!(["Work", "Personal"]));
}

// ---------------------------------------------------------------------------
// Response bounding at the tool surface
// ---------------------------------------------------------------------------

#[tokio::test]
async fn oversized_tool_response_is_bounded() {
    let upstream = MockServer::start().await;
    let blocks: Vec<Value> = (0..2000)
        .map(|i| json!({"id": format!("b{i}"), "content": "c".repeat(400)}))
        .collect();
    Mock::given(method("GET"))
        .and(path("/blocks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(blocks)))
        .mount(&upstream)
        .await;

    let documents = vec![DocumentConfig {
        name: "Notes".to_string(),
        api_endpoint: upstream.uri(),
    }];
    let config = ServerConfig {
        documents,
        upstream_timeout: Duration::from_secs(5),
        max_response_bytes: 16 * 1024,
        truncation: TruncationPolicy::default(),
    };
    let service = NotesService::from_config(&config).unwrap();

    let req = request(
        12,
        "tools/call",
        Some(json!({"name": "read_document", "arguments": {"documentName": "Notes"}})),
    );

    let response = handlers::dispatch(&req, &service).await.unwrap();
    let result = response.result.unwrap();
    assert!(result.get("isError").is_none());

    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(text.len() <= 16 * 1024 + 1, "serialized payload must fit the budget");

    let payload: Value = serde_json::from_str(text).unwrap();
    assert_eq!(payload["_metadata"]["truncated"], json!(true));
    assert_eq!(payload["documentName"], json!("Notes"));
}
