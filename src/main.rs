use std::sync::Arc;

use mcp_notes_server::config::ServerConfig;
use mcp_notes_server::notes::NotesService;
use mcp_notes_server::server::StdioServer;
use mcp_notes_server::{rest, sse};

const DEFAULT_BIND: &str = "127.0.0.1:8787";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    let config = match ServerConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("mcp-notes-server: configuration error: {e}");
            std::process::exit(1);
        }
    };

    let service = match NotesService::from_config(&config) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("mcp-notes-server: startup error: {e}");
            std::process::exit(1);
        }
    };

    let transport = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("NOTES_TRANSPORT").ok())
        .unwrap_or_else(|| "stdio".to_string());
    let bind = std::env::var("NOTES_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());

    let outcome = match transport.as_str() {
        "stdio" => {
            let mut server = StdioServer::new(service);
            server.run().await
        }
        "sse" => sse::serve(service, &bind).await,
        "rest" => rest::serve(service, &bind).await,
        other => {
            eprintln!(
                "mcp-notes-server: unknown transport '{other}' (expected stdio, sse, or rest)"
            );
            std::process::exit(2);
        }
    };

    if let Err(e) = outcome {
        eprintln!("mcp-notes-server: fatal error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mcp_notes_server=info"));

    // stdout belongs to the stdio transport; logs must not mix into it.
    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
