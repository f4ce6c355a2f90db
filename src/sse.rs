//! SSE event-channel transport.
//!
//! `GET /sse` opens a long-lived event stream; the first event is
//! `endpoint`, telling the client where to POST its JSON-RPC requests.
//! `POST /messages` dispatches a request and delivers the response as a
//! `message` event on the addressed stream.
//!
//! The session registry is process-wide state: insert on connect, remove
//! when the stream drops. A POST without a `sessionId` routes to the most
//! recently opened live session — last-writer-wins, which can misroute when
//! two clients connect concurrently; clients that echo their session id are
//! always routed exactly.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info};
use uuid::Uuid;

use crate::handlers;
use crate::notes::NotesService;
use crate::protocol::{JsonRpcRequest, JsonRpcResponse};

/// Per-session outbound buffer (responses awaiting delivery).
const SESSION_BUFFER: usize = 32;

#[derive(Default)]
struct Registry {
    sessions: HashMap<String, mpsc::Sender<String>>,
    /// Session ids in connection order; the tail is the fallback routing
    /// target for POSTs that omit `sessionId`.
    order: Vec<String>,
}

impl Registry {
    fn insert(&mut self, id: String, tx: mpsc::Sender<String>) {
        self.sessions.insert(id.clone(), tx);
        self.order.push(id);
    }

    fn remove(&mut self, id: &str) {
        self.sessions.remove(id);
        self.order.retain(|s| s != id);
    }

    fn resolve(&self, requested: Option<&str>) -> Option<(String, mpsc::Sender<String>)> {
        let id = match requested {
            Some(id) => id,
            None => self.order.last()?.as_str(),
        };
        let tx = self.sessions.get(id)?.clone();
        Some((id.to_string(), tx))
    }
}

struct SseState {
    service: Arc<NotesService>,
    registry: Arc<Mutex<Registry>>,
}

/// Removes its session from the registry when the event stream drops.
struct SessionGuard {
    registry: Arc<Mutex<Registry>>,
    session_id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Ok(mut registry) = self.registry.lock() {
            registry.remove(&self.session_id);
        }
        info!(session = %self.session_id, "event channel closed");
    }
}

/// Serve the SSE transport on `bind` until ctrl-c.
pub async fn serve(
    service: Arc<NotesService>,
    bind: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(SseState {
        service,
        registry: Arc::new(Mutex::new(Registry::default())),
    });

    let router = Router::new()
        .route("/sse", get(open_stream))
        .route("/messages", post(post_message))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(%bind, "SSE transport listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}

async fn open_stream(
    State(state): State<Arc<SseState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = Uuid::new_v4().to_string();
    let (tx, rx) = mpsc::channel::<String>(SESSION_BUFFER);

    state
        .registry
        .lock()
        .expect("session registry lock poisoned")
        .insert(session_id.clone(), tx);
    info!(session = %session_id, "event channel opened");

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/messages?sessionId={session_id}"));

    let guard = SessionGuard {
        registry: state.registry.clone(),
        session_id,
    };
    let messages = ReceiverStream::new(rx).map(move |payload| {
        // The guard rides inside the stream so the session is deregistered
        // exactly when the client goes away.
        let _keep_alive = &guard;
        Event::default().event("message").data(payload)
    });

    let stream = tokio_stream::once(endpoint)
        .chain(messages)
        .map(Ok::<Event, Infallible>);
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

async fn post_message(
    State(state): State<Arc<SseState>>,
    Query(query): Query<MessageQuery>,
    Json(req): Json<JsonRpcRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let target = state
        .registry
        .lock()
        .expect("session registry lock poisoned")
        .resolve(query.session_id.as_deref());

    let Some((session_id, tx)) = target else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no live event channel for this session" })),
        );
    };

    if req.jsonrpc != "2.0" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "unsupported JSON-RPC version" })),
        );
    }

    debug!(session = %session_id, method = %req.method, "event-channel request");

    let Some(response) = handlers::dispatch(&req, &state.service).await else {
        // Notification: nothing to deliver.
        return (StatusCode::ACCEPTED, Json(json!({ "status": "accepted" })));
    };

    if deliver(&tx, &response).await.is_err() {
        // The stream closed between lookup and send; drop the session.
        state
            .registry
            .lock()
            .expect("session registry lock poisoned")
            .remove(&session_id);
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "event channel closed before delivery" })),
        );
    }

    (StatusCode::ACCEPTED, Json(json!({ "status": "accepted" })))
}

async fn deliver(
    tx: &mpsc::Sender<String>,
    response: &JsonRpcResponse,
) -> Result<(), mpsc::error::SendError<String>> {
    let payload =
        serde_json::to_string(response).expect("JSON-RPC response must serialize to string");
    tx.send(payload).await
}
