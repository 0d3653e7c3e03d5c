//! Newline-delimited JSON-RPC over stdin/stdout.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::mcp::McpServer;

/// Serve the process's stdin/stdout until stdin closes.
pub async fn serve(server: McpServer) -> std::io::Result<()> {
    serve_io(server, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}

/// One message per line in, one response per line out. Requests are handled
/// in arrival order.
pub async fn serve_io<R, W>(server: McpServer, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(response) = server.handle_message(line).await {
            writer.write_all(response.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
    }

    tracing::info!("Input closed, stopping stdio transport");
    Ok(())
}
