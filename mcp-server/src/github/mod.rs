//! GitHub Enterprise API client.
//!
//! One [`GitHubClient`] exists per process. It owns the connection pool, the
//! retry policy used for the consumed-licenses walk, and the endpoints
//! derived from configuration.

mod models;
mod paginate;
mod retry;

pub use models::{Email, License, Organization, User};
pub use paginate::{fetch_all, fetch_first_page, next_link};
pub use retry::{RetryExecutor, RetryPolicy};

use std::time::Duration;

use async_trait::async_trait;
use ghe_mcp_common::RawLicenseAggregate;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::config::{ConfigError, GithubConfig, LicensesConfig, RetryConfig};
use crate::error::{Error, Result};
use crate::licenses::LicenseSource;

const USER_AGENT: &str = concat!("ghe-mcp/", env!("CARGO_PKG_VERSION"));

pub struct GitHubClient {
    executor: RetryExecutor,
    base_url: String,
    licenses_url: String,
    page_size: u32,
    max_pages: Option<u32>,
}

impl GitHubClient {
    pub fn new(
        github: &GithubConfig,
        licenses: &LicensesConfig,
        retry: &RetryConfig,
    ) -> std::result::Result<Self, ConfigError> {
        let http_client = build_http_client(github)?;
        Ok(Self {
            executor: RetryExecutor::new(http_client, RetryPolicy::from(retry)),
            base_url: github.base_url().to_string(),
            licenses_url: github.consumed_licenses_url(),
            page_size: licenses.page_size,
            max_pages: licenses.max_pages,
        })
    }

    pub fn licenses_url(&self) -> &str {
        &self.licenses_url
    }

    pub async fn list_enterprise_users(&self) -> Result<Vec<User>> {
        self.get("enterprise/users").await
    }

    pub async fn get_user(&self, username: &str) -> Result<User> {
        self.get(&format!("users/{}", path_segment(username)?)).await
    }

    pub async fn list_user_organizations(&self, username: &str) -> Result<Vec<Organization>> {
        self.get(&format!("users/{}/orgs", path_segment(username)?))
            .await
    }

    pub async fn list_organizations(&self) -> Result<Vec<Organization>> {
        self.get("organizations").await
    }

    /// Requires admin access for enterprise-managed users.
    pub async fn get_user_emails(&self, username: &str) -> Result<Vec<Email>> {
        self.get(&format!("users/{}/emails", path_segment(username)?))
            .await
    }

    pub async fn list_enterprise_licenses(&self) -> Result<Vec<License>> {
        self.get("enterprise/licenses").await
    }

    pub async fn get_license(&self, id: &str) -> Result<License> {
        self.get(&format!("enterprise/licenses/{}", path_segment(id)?))
            .await
    }

    /// Single GET without retry.
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        tracing::debug!("GET {}", url);

        let response = self
            .executor
            .client()
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::TransientRequestFailure {
                attempts: 1,
                status: None,
                detail: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("GitHub API error: {} - {}", status, body);
            return Err(Error::RequestFailure { status, body });
        }

        response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(format!("{}: {}", path, e)))
    }
}

#[async_trait]
impl LicenseSource for GitHubClient {
    async fn fetch_all(&self) -> Result<RawLicenseAggregate> {
        fetch_all(&self.executor, &self.licenses_url, self.page_size, self.max_pages).await
    }

    async fn fetch_first_page(&self) -> Result<RawLicenseAggregate> {
        fetch_first_page(&self.executor, &self.licenses_url, self.page_size).await
    }
}

fn build_http_client(github: &GithubConfig) -> std::result::Result<Client, ConfigError> {
    let invalid = |msg: String| ConfigError::Invalid(config::ConfigError::Message(msg));

    let mut headers = HeaderMap::new();
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", github.token.trim()))
        .map_err(|_| invalid("GITHUB_TOKEN contains characters not allowed in a header".to_string()))?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);
    headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
    headers.insert(
        "x-github-api-version",
        HeaderValue::from_str(&github.api_version)
            .map_err(|_| invalid(format!("invalid api_version: {}", github.api_version)))?,
    );

    Client::builder()
        .default_headers(headers)
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(github.timeout_secs))
        .build()
        .map_err(|e| invalid(format!("failed to build HTTP client: {}", e)))
}

/// Reject values that would change the request path.
fn path_segment(value: &str) -> Result<&str> {
    let value = value.trim();
    let dot_segment = value == "." || value == "..";
    if value.is_empty()
        || dot_segment
        || value.contains(|c: char| matches!(c, '/' | '?' | '#' | '%') || c.is_whitespace())
    {
        return Err(Error::InvalidParams(format!("invalid path segment: {:?}", value)));
    }
    Ok(value)
}
