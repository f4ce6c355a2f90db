//! HTTP client for the upstream block-store document API.
//!
//! Two operations against a configured base endpoint: fetch a block subtree
//! (or the document root) and search blocks by pattern. Single attempt per
//! call, fixed timeout, no retries — failure isolation happens one level up,
//! in the aggregator.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// User-Agent string for upstream requests.
const USER_AGENT: &str = concat!("mcp-notes-server/", env!("CARGO_PKG_VERSION"));

/// How much of an error response body is echoed into error messages.
const ERROR_BODY_MAX_CHARS: usize = 200;

/// Failure modes of a single upstream call.
///
/// Every variant renders to the caller-visible error string; none of them
/// escapes the aggregator as anything but data.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("request timed out after {0} seconds")]
    Timeout(u64),
    #[error("network error: {0}")]
    Transport(String),
    #[error("{0}")]
    Upstream(String),
    #[error("invalid response body: {0}")]
    Decode(String),
}

/// Options for a `fetch_blocks` call. An omitted `id` fetches the document
/// root; `max_depth` semantics are owned by the upstream API and forwarded
/// verbatim.
#[derive(Debug, Clone, Default)]
pub struct FetchBlocksRequest {
    pub id: Option<String>,
    pub max_depth: Option<u32>,
    pub fetch_metadata: Option<bool>,
}

/// Options for a `search_blocks` call.
#[derive(Debug, Clone)]
pub struct SearchBlocksRequest {
    pub pattern: String,
    pub case_sensitive: bool,
    pub before_block_count: Option<u32>,
    pub after_block_count: Option<u32>,
}

/// A single search match: the matched block plus optional context the
/// upstream supplies. `document_name` is filled in by the aggregator, never
/// by the client.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub block: Value,
    #[serde(rename = "documentName", skip_serializing_if = "Option::is_none")]
    pub document_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<String>>,
}

/// Client for one-or-more upstream block-store APIs. Cheap to clone; the
/// underlying connection pool is shared.
#[derive(Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl UpstreamClient {
    pub fn new(timeout: Duration) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout_secs: timeout.as_secs(),
        })
    }

    /// `GET {endpoint}/blocks?id&maxDepth&fetchMetadata` — a single block
    /// subtree by id, or the document root when `id` is omitted. Returns the
    /// raw JSON body (single block or block array) as opaque data.
    pub async fn fetch_blocks(
        &self,
        endpoint: &str,
        req: &FetchBlocksRequest,
    ) -> Result<Value, UpstreamError> {
        let url = format!("{}/blocks", endpoint.trim_end_matches('/'));

        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(id) = &req.id {
            query.push(("id", id.clone()));
        }
        if let Some(depth) = req.max_depth {
            query.push(("maxDepth", depth.to_string()));
        }
        if let Some(meta) = req.fetch_metadata {
            query.push(("fetchMetadata", meta.to_string()));
        }

        self.get_json(&url, &query).await
    }

    /// `GET {endpoint}/blocks/search?pattern&caseSensitive&...` — flat block
    /// matches, each wrapped into a [`SearchResult`].
    pub async fn search_blocks(
        &self,
        endpoint: &str,
        req: &SearchBlocksRequest,
    ) -> Result<Vec<SearchResult>, UpstreamError> {
        let url = format!("{}/blocks/search", endpoint.trim_end_matches('/'));

        let mut query: Vec<(&str, String)> = vec![
            ("pattern", req.pattern.clone()),
            ("caseSensitive", req.case_sensitive.to_string()),
        ];
        if let Some(before) = req.before_block_count {
            query.push(("beforeBlockCount", before.to_string()));
        }
        if let Some(after) = req.after_block_count {
            query.push(("afterBlockCount", after.to_string()));
        }

        let body = self.get_json(&url, &query).await?;
        let items = match body {
            Value::Array(items) => items,
            other => {
                return Err(UpstreamError::Decode(format!(
                    "expected a JSON array of matches, got {}",
                    json_type_name(&other)
                )));
            }
        };

        Ok(items.into_iter().map(wrap_match).collect())
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, UpstreamError> {
        debug!(%url, "upstream request");

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            return Err(UpstreamError::Upstream(error_from_body(status, &body)));
        }

        serde_json::from_str(&body).map_err(|e| UpstreamError::Decode(e.to_string()))
    }

    fn classify(&self, err: reqwest::Error) -> UpstreamError {
        if err.is_timeout() {
            UpstreamError::Timeout(self.timeout_secs)
        } else {
            UpstreamError::Transport(err.to_string())
        }
    }
}

/// Normalize one search response element. The upstream may return raw blocks
/// or pre-wrapped `{block, path}` objects; both shapes collapse to a
/// [`SearchResult`].
fn wrap_match(item: Value) -> SearchResult {
    if let Value::Object(mut map) = item {
        if map.contains_key("block") {
            let block = map.remove("block").unwrap_or(Value::Null);
            let path = map
                .remove("path")
                .and_then(|p| serde_json::from_value::<Vec<String>>(p).ok());
            return SearchResult {
                block,
                document_name: None,
                path,
            };
        }
        return SearchResult {
            block: Value::Object(map),
            document_name: None,
            path: None,
        };
    }

    SearchResult {
        block: item,
        document_name: None,
        path: None,
    }
}

/// Derive a caller-visible message from a non-2xx response: the body's
/// `error`/`message` field when present, else the trimmed body, else the
/// status line.
fn error_from_body(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["error", "message"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                if !msg.is_empty() {
                    return msg.to_string();
                }
            }
        }
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() {
        let snippet: String = trimmed.chars().take(ERROR_BODY_MAX_CHARS).collect();
        return format!("upstream returned HTTP {}: {snippet}", status.as_u16());
    }

    format!("upstream returned HTTP {}", status.as_u16())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
