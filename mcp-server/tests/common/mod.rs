//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use ghe_mcp_server::{AppState, Config, McpServer};
use serde_json::{json, Value};
use wiremock::MockServer;

pub fn config_for(server: &MockServer, extra: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = HashMap::from([
        ("GITHUB_TOKEN".to_string(), "ghp_test".to_string()),
        ("GITHUB_ENTERPRISE_URL".to_string(), server.uri()),
        ("GHE_MCP__RETRY__BASE_DELAY_MS".to_string(), "1".to_string()),
    ]);
    for (key, value) in extra {
        vars.insert(key.to_string(), value.to_string());
    }
    Config::from_vars(vars).unwrap()
}

pub fn mcp_server(server: &MockServer) -> McpServer {
    let state = AppState::new(config_for(server, &[])).unwrap();
    McpServer::new(Arc::new(state))
}

pub fn seat(login: &str) -> Value {
    json!({
        "github_com_login": login,
        "github_com_name": format!("{} name", login),
        "license_type": "enterprise",
        "github_com_member_roles": ["platform:Owner", "docs:Member"],
        "github_com_enterprise_role": "owner",
        "github_com_enterprise_roles": ["billing_manager"],
        "github_com_two_factor_auth": true
    })
}

pub fn page(purchased: u64, consumed: u64, logins: &[&str]) -> Value {
    json!({
        "total_seats_purchased": purchased,
        "total_seats_consumed": consumed,
        "users": logins.iter().map(|l| seat(l)).collect::<Vec<_>>()
    })
}

/// A later page: seats only, no summary fields.
pub fn seats_only_page(logins: &[&str]) -> Value {
    json!({ "users": logins.iter().map(|l| seat(l)).collect::<Vec<_>>() })
}

/// `Link` header pointing at `page` of the consumed-licenses endpoint.
pub fn next_link(server: &MockServer, page: u32) -> String {
    format!(
        "<{}/consumed-licenses?per_page=100&page={}>; rel=\"next\", <{}/consumed-licenses?per_page=100&page=9>; rel=\"last\"",
        server.uri(),
        page,
        server.uri()
    )
}

pub fn tool_call(id: u64, name: &str, arguments: Value) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments }
    })
    .to_string()
}

/// Parse the JSON carried in a successful tool result's first text block.
pub fn tool_output(response: &Value) -> Value {
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
