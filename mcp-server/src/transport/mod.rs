//! Transports carrying JSON-RPC messages between the host and the server.

pub mod sse;
pub mod stdio;

use crate::config::{ServerConfig, Transport};
use crate::mcp::McpServer;

/// Run the configured transport until it stops.
pub async fn run(server: McpServer, config: &ServerConfig) -> std::io::Result<()> {
    match config.transport {
        Transport::Stdio => {
            tracing::info!("Serving over stdio");
            stdio::serve(server).await
        }
        Transport::Sse => sse::serve(server, &config.host, config.port).await,
    }
}
