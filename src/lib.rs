//! MCP server for block-based note document APIs.
//!
//! Exposes five read-only tools (`list_documents`, `search_all_notes`,
//! `search_document`, `read_document`, `read_block`) over JSON-RPC 2.0 stdio,
//! an SSE event channel, and a plain REST facade for stateless hosting.
//! Searches fan out across every configured document endpoint with
//! per-document failure isolation, and every response is bounded to a byte
//! budget before it leaves the process.

pub mod bound;
pub mod config;
pub mod handlers;
pub mod notes;
pub mod protocol;
pub mod rest;
pub mod server;
pub mod sse;
pub mod upstream;

pub mod schema;
