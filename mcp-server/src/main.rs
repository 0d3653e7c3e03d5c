//! GitHub Enterprise MCP server binary.

use std::env;
use std::sync::Arc;

use ghe_mcp_server::{logging, transport, AppState, Config, McpServer};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    println!("ghe-mcp {}", VERSION);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle --version / -V
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--version" || a == "-V") {
        print_version();
        return Ok(());
    }

    let config = Config::load().map_err(|e| {
        format!(
            "Failed to load configuration: {}. \
             Set GITHUB_TOKEN and GITHUB_ENTERPRISE_URL, or provide them in config.toml.",
            e
        )
    })?;

    logging::init(&config.logging.level);
    tracing::info!(
        "Starting ghe-mcp {} against {} ({:?} transport)",
        VERSION,
        config.github.base_url(),
        config.server.transport
    );

    let server_config = config.server.clone();
    let state = Arc::new(AppState::new(config)?);
    let server = McpServer::new(state);

    transport::run(server, &server_config).await?;

    tracing::info!("Shut down");
    Ok(())
}
