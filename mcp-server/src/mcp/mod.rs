//! JSON-RPC dispatch for the Model Context Protocol method set.

pub mod resources;
pub mod tools;

use std::sync::Arc;

use serde_json::{json, Value};

use ghe_mcp_common::protocol::error_codes;
use ghe_mcp_common::{
    JsonRpcRequest, JsonRpcResponse, ResourceContents, ToolResult, PROTOCOL_VERSION,
};

use crate::error::Error;
use crate::state::AppState;

const SERVER_NAME: &str = "GitHub Enterprise MCP";

/// Transport-independent request handler.
#[derive(Clone)]
pub struct McpServer {
    state: Arc<AppState>,
}

impl McpServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Handle one raw message. Returns the serialized response, or `None` for
    /// notifications.
    pub async fn handle_message(&self, message: &str) -> Option<String> {
        let response = match serde_json::from_str::<JsonRpcRequest>(message) {
            Ok(request) => self.handle_request(request).await?,
            Err(e) => JsonRpcResponse::error(
                Value::Null,
                error_codes::PARSE_ERROR,
                format!("Parse error: {}", e),
            ),
        };

        match serde_json::to_string(&response) {
            Ok(json) => Some(json),
            Err(e) => {
                tracing::error!("Failed to serialize response: {}", e);
                None
            }
        }
    }

    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            tracing::debug!("Notification: {}", request.method);
            return None;
        }

        let id = request.id.clone().unwrap_or(Value::Null);
        if !request.has_valid_version() {
            return Some(JsonRpcResponse::error(
                id,
                error_codes::INVALID_REQUEST,
                format!("Unsupported jsonrpc version: {:?}", request.jsonrpc),
            ));
        }

        let params = request.params.unwrap_or(Value::Null);
        tracing::debug!("Request {}: {}", id, request.method);

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, self.initialize()),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": tools::definitions() })),
            "tools/call" => self.call_tool(id, &params).await,
            "resources/list" => {
                JsonRpcResponse::success(id, json!({ "resources": resources::definitions() }))
            }
            "resources/templates/list" => JsonRpcResponse::success(
                id,
                json!({ "resourceTemplates": resources::templates() }),
            ),
            "resources/read" => self.read_resource(id, &params).await,
            _ => JsonRpcResponse::error(id, error_codes::METHOD_NOT_FOUND, "Method not found"),
        };

        Some(response)
    }

    fn initialize(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {},
                "resources": {}
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    async fn call_tool(&self, id: Value, params: &Value) -> JsonRpcResponse {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return JsonRpcResponse::error(id, error_codes::INVALID_PARAMS, "Missing tool name");
        };
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        let result = match tools::call(&self.state, name, arguments).await {
            Ok(output) => ToolResult::text(pretty(&output)),
            Err(e @ (Error::InvalidParams(_) | Error::NotFound(_))) => {
                return JsonRpcResponse::error(id, error_codes::INVALID_PARAMS, e.to_string());
            }
            Err(e) => {
                tracing::warn!("Tool {} failed: {}", name, e);
                ToolResult::error(format!("Error: {}", e))
            }
        };

        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::error(id, error_codes::INTERNAL_ERROR, e.to_string()),
        }
    }

    async fn read_resource(&self, id: Value, params: &Value) -> JsonRpcResponse {
        let Some(uri) = params.get("uri").and_then(Value::as_str) else {
            return JsonRpcResponse::error(id, error_codes::INVALID_PARAMS, "Missing resource uri");
        };

        match resources::read(&self.state, uri).await {
            Ok(value) => {
                let contents = ResourceContents {
                    uri: uri.to_string(),
                    mime_type: resources::mime_type().to_string(),
                    text: pretty(&value),
                };
                JsonRpcResponse::success(id, json!({ "contents": [contents] }))
            }
            Err(e @ (Error::InvalidParams(_) | Error::NotFound(_) | Error::UserNotFound(_))) => {
                JsonRpcResponse::error(id, error_codes::INVALID_PARAMS, e.to_string())
            }
            Err(e) => {
                tracing::warn!("Resource {} failed: {}", uri, e);
                JsonRpcResponse::error(id, error_codes::INTERNAL_ERROR, e.to_string())
            }
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
