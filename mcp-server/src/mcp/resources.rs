//! Read-only resources addressed by `github://` URIs.

use serde_json::Value;

use ghe_mcp_common::{ResourceDefinition, ResourceTemplate};

use super::tools::to_value;
use crate::error::{Error, Result};
use crate::state::AppState;

const SCHEME: &str = "github://";
const MIME_JSON: &str = "application/json";

/// Parsed resource URI.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Resource<'a> {
    Users,
    Organizations,
    Licenses,
    ConsumedLicenses,
    User(&'a str),
    UserOrganizations(&'a str),
    UserAccess(&'a str),
}

impl<'a> Resource<'a> {
    fn parse(uri: &'a str) -> Option<Self> {
        let path = uri.strip_prefix(SCHEME)?;
        let segments: Vec<&str> = path.split('/').collect();
        match segments.as_slice() {
            ["users"] => Some(Resource::Users),
            ["organizations"] => Some(Resource::Organizations),
            ["licenses"] => Some(Resource::Licenses),
            ["consumed-licenses"] => Some(Resource::ConsumedLicenses),
            ["user", name] if !name.is_empty() => Some(Resource::User(*name)),
            ["user", name, "organizations"] if !name.is_empty() => {
                Some(Resource::UserOrganizations(*name))
            }
            ["user", name, "access"] if !name.is_empty() => Some(Resource::UserAccess(*name)),
            _ => None,
        }
    }
}

pub fn definitions() -> Vec<ResourceDefinition> {
    [
        ("users", "Enterprise users", "All users in the enterprise"),
        ("organizations", "Enterprise organizations", "All organizations in the enterprise"),
        ("licenses", "Enterprise licenses", "All licenses in the enterprise"),
        (
            "consumed-licenses",
            "Consumed licenses",
            "Seat totals of the consumed-licenses report",
        ),
    ]
    .into_iter()
    .map(|(path, name, description)| ResourceDefinition {
        uri: format!("{}{}", SCHEME, path),
        name: name.to_string(),
        description: description.to_string(),
        mime_type: MIME_JSON.to_string(),
    })
    .collect()
}

pub fn templates() -> Vec<ResourceTemplate> {
    [
        ("user/{username}", "User", "Information about a specific GitHub user"),
        (
            "user/{username}/organizations",
            "User organizations",
            "Organizations for a specific GitHub user",
        ),
        (
            "user/{username}/access",
            "User access",
            "Organizations and enterprise roles from the user's license seat",
        ),
    ]
    .into_iter()
    .map(|(path, name, description)| ResourceTemplate {
        uri_template: format!("{}{}", SCHEME, path),
        name: name.to_string(),
        description: description.to_string(),
        mime_type: MIME_JSON.to_string(),
    })
    .collect()
}

pub fn mime_type() -> &'static str {
    MIME_JSON
}

/// Read a resource as JSON.
pub async fn read(state: &AppState, uri: &str) -> Result<Value> {
    let resource =
        Resource::parse(uri).ok_or_else(|| Error::NotFound(format!("unknown resource: {}", uri)))?;

    match resource {
        Resource::Users => to_value(&state.github.list_enterprise_users().await?),
        Resource::Organizations => to_value(&state.github.list_organizations().await?),
        Resource::Licenses => to_value(&state.github.list_enterprise_licenses().await?),
        Resource::ConsumedLicenses => to_value(
            &state
                .licenses
                .list_consumed_licenses(false, true, false)
                .await?,
        ),
        Resource::User(name) => to_value(&state.github.get_user(name).await?),
        Resource::UserOrganizations(name) => {
            to_value(&state.github.list_user_organizations(name).await?)
        }
        Resource::UserAccess(name) => to_value(&state.licenses.user_access(name).await?),
    }
}
