//! Read-only GitHub Enterprise MCP server.
//!
//! Exposes enterprise users, organizations and license consumption as MCP
//! tools and resources over stdio or SSE.

pub mod config;
pub mod error;
pub mod github;
pub mod licenses;
pub mod logging;
pub mod mcp;
pub mod state;
pub mod transport;

pub use config::{Config, ConfigError, Transport};
pub use error::{Error, Result};
pub use github::GitHubClient;
pub use licenses::{LicenseCache, LicenseService, LicenseSource};
pub use mcp::McpServer;
pub use state::AppState;
