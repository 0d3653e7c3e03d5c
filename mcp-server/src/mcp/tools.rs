//! Tool definitions and invocation.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use ghe_mcp_common::ToolDefinition;

use crate::error::{Error, Result};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct ListConsumedLicensesArgs {
    #[serde(default)]
    include_users: bool,
    #[serde(default = "default_true")]
    full_pagination: bool,
    #[serde(default)]
    force_refresh: bool,
}

#[derive(Debug, Deserialize)]
struct UsernameArgs {
    username: String,
}

#[derive(Debug, Deserialize)]
struct LicenseIdArgs {
    id: String,
}

fn default_true() -> bool {
    true
}

/// Every tool advertised by `tools/list`.
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        tool(
            "list_consumed_licenses",
            "Summarize consumed enterprise license seats, optionally with every seat",
            json!({
                "type": "object",
                "properties": {
                    "include_users": {
                        "type": "boolean",
                        "description": "Include the normalized seat list (default: false)"
                    },
                    "full_pagination": {
                        "type": "boolean",
                        "description": "Walk every page instead of only the first (default: true)"
                    },
                    "force_refresh": {
                        "type": "boolean",
                        "description": "Ignore the cached aggregate and refetch (default: false)"
                    }
                }
            }),
        ),
        tool(
            "get_user_organizations",
            "Organizations and organization roles of a licensed user",
            username_schema(),
        ),
        tool(
            "get_user_enterprise_roles",
            "Enterprise roles of a licensed user",
            username_schema(),
        ),
        tool(
            "get_user_detail",
            "Full consumed-license seat of a user",
            username_schema(),
        ),
        tool(
            "get_user_access",
            "Organizations and enterprise roles of a licensed user in one call",
            username_schema(),
        ),
        tool(
            "list_enterprise_users",
            "List all users in the GitHub Enterprise instance",
            empty_schema(),
        ),
        tool(
            "get_user_info",
            "Get detailed information for a specific GitHub user",
            username_schema(),
        ),
        tool(
            "list_user_organizations",
            "Get all organizations that a user belongs to",
            username_schema(),
        ),
        tool(
            "list_enterprise_organizations",
            "List all organizations in the GitHub Enterprise instance",
            empty_schema(),
        ),
        tool(
            "get_user_emails",
            "Get all email addresses for a user (requires admin access)",
            username_schema(),
        ),
        tool(
            "list_enterprise_licenses",
            "List all licenses in the GitHub Enterprise instance",
            empty_schema(),
        ),
        tool(
            "get_license_info",
            "Get detailed information for a specific license",
            json!({
                "type": "object",
                "properties": {
                    "id": { "type": "string", "description": "The license ID to look up" }
                },
                "required": ["id"]
            }),
        ),
    ]
}

/// Invoke a tool by name. Returns the tool's JSON output.
pub async fn call(state: &AppState, name: &str, arguments: Value) -> Result<Value> {
    match name {
        "list_consumed_licenses" => {
            let args: ListConsumedLicensesArgs = parse_args(arguments)?;
            let result = state
                .licenses
                .list_consumed_licenses(args.include_users, args.full_pagination, args.force_refresh)
                .await?;
            to_value(&result)
        }
        "get_user_organizations" => {
            let args: UsernameArgs = parse_args(arguments)?;
            to_value(&state.licenses.user_organizations(&args.username).await?)
        }
        "get_user_enterprise_roles" => {
            let args: UsernameArgs = parse_args(arguments)?;
            to_value(&state.licenses.user_enterprise_roles(&args.username).await?)
        }
        "get_user_detail" => {
            let args: UsernameArgs = parse_args(arguments)?;
            to_value(&state.licenses.user_detail(&args.username).await?)
        }
        "get_user_access" => {
            let args: UsernameArgs = parse_args(arguments)?;
            to_value(&state.licenses.user_access(&args.username).await?)
        }
        "list_enterprise_users" => to_value(&state.github.list_enterprise_users().await?),
        "get_user_info" => {
            let args: UsernameArgs = parse_args(arguments)?;
            to_value(&state.github.get_user(&args.username).await?)
        }
        "list_user_organizations" => {
            let args: UsernameArgs = parse_args(arguments)?;
            to_value(&state.github.list_user_organizations(&args.username).await?)
        }
        "list_enterprise_organizations" => to_value(&state.github.list_organizations().await?),
        "get_user_emails" => {
            let args: UsernameArgs = parse_args(arguments)?;
            to_value(&state.github.get_user_emails(&args.username).await?)
        }
        "list_enterprise_licenses" => to_value(&state.github.list_enterprise_licenses().await?),
        "get_license_info" => {
            let args: LicenseIdArgs = parse_args(arguments)?;
            to_value(&state.github.get_license(&args.id).await?)
        }
        _ => Err(Error::NotFound(format!("unknown tool: {}", name))),
    }
}

fn tool(name: &str, description: &str, input_schema: Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

fn username_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "username": { "type": "string", "description": "The GitHub username to look up" }
        },
        "required": ["username"]
    })
}

fn empty_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

/// Missing arguments are treated as `{}`.
fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T> {
    let arguments = if arguments.is_null() { json!({}) } else { arguments };
    serde_json::from_value(arguments).map_err(|e| Error::InvalidParams(e.to_string()))
}

pub(crate) fn to_value<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::InvalidResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definitions_are_unique_objects() {
        let tools = definitions();
        let mut names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), tools.len());
        assert!(tools.iter().all(|t| t.input_schema["type"] == "object"));
    }

    #[test]
    fn test_list_args_defaults() {
        let args: ListConsumedLicensesArgs = parse_args(Value::Null).unwrap();
        assert!(!args.include_users);
        assert!(args.full_pagination);
        assert!(!args.force_refresh);
    }

    #[test]
    fn test_username_required() {
        let err = parse_args::<UsernameArgs>(json!({})).unwrap_err();
        assert!(matches!(err, Error::InvalidParams(_)));
    }
}
