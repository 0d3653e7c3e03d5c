//! Configuration for the MCP server.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use config::{Config as ConfigLoader, Environment, File};
use serde::Deserialize;

/// Prefix for structured overrides (`GHE_MCP__SECTION__KEY`).
pub const ENV_PREFIX: &str = "GHE_MCP";

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub licenses: LicensesConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    /// Token sent as `Authorization: Bearer`.
    #[serde(default)]
    pub token: String,
    /// API root, e.g. `https://api.github.com` or `https://ghe.example.com/api/v3`.
    #[serde(default)]
    pub api_url: String,
    /// Enterprise slug. When set, consumed licenses are read from
    /// `{api_url}/enterprises/{enterprise}`; otherwise `api_url` is already
    /// the enterprise base.
    #[serde(default)]
    pub enterprise: Option<String>,
    /// Value of the `X-GitHub-Api-Version` header.
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Per-request transport timeout.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: String::new(),
            enterprise: None,
            api_version: default_api_version(),
            timeout_secs: default_timeout(),
        }
    }
}

impl GithubConfig {
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }

    pub fn consumed_licenses_url(&self) -> String {
        match self.enterprise.as_deref() {
            Some(slug) if !slug.is_empty() => {
                format!("{}/enterprises/{}/consumed-licenses", self.base_url(), slug)
            }
            _ => format!("{}/consumed-licenses", self.base_url()),
        }
    }
}

/// Which transport the host talks to us over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Stdio,
    Sse,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub transport: Transport,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: Transport::default(),
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LicensesConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    /// Upper bound on pages per walk. Unset means follow `next` links until
    /// the API stops sending them.
    #[serde(default)]
    pub max_pages: Option<u32>,
    /// Serialize concurrent cache misses so only one walk runs at a time.
    #[serde(default)]
    pub single_flight: bool,
}

impl Default for LicensesConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            cache_ttl_secs: default_cache_ttl(),
            max_pages: None,
            single_flight: false,
        }
    }
}

impl LicensesConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default values
fn default_api_version() -> String {
    "2022-11-28".to_string()
}
fn default_timeout() -> u64 {
    30
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8050
}
fn default_page_size() -> u32 {
    100
}
fn default_cache_ttl() -> u64 {
    crate::licenses::DEFAULT_TTL.as_secs()
}
fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay() -> u64 {
    1000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. `GITHUB_TOKEN`, `GITHUB_ENTERPRISE_URL`, `GITHUB_ENTERPRISE`,
    ///    `TRANSPORT`, `HOST`, `PORT`
    /// 2. Environment variables (GHE_MCP__SECTION__KEY format)
    /// 3. config.toml file (if present)
    /// 4. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_vars(env::vars().collect())
    }

    /// Same as [`Config::load`], reading variables from `vars` instead of the
    /// process environment.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let var = |name: &str| vars.get(name).filter(|v| !v.is_empty()).cloned();

        let config = ConfigLoader::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(vars.clone())),
            )
            .set_override_option("github.token", var("GITHUB_TOKEN"))?
            .set_override_option("github.api_url", var("GITHUB_ENTERPRISE_URL"))?
            .set_override_option("github.enterprise", var("GITHUB_ENTERPRISE"))?
            .set_override_option(
                "server.transport",
                var("TRANSPORT").map(|t| t.to_lowercase()),
            )?
            .set_override_option("server.host", var("HOST"))?
            .set_override_option("server.port", var("PORT"))?
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.github.token.trim().is_empty() {
            return Err(ConfigError::MissingEnvVar("GITHUB_TOKEN"));
        }
        if self.github.api_url.trim().is_empty() {
            return Err(ConfigError::MissingEnvVar("GITHUB_ENTERPRISE_URL"));
        }
        if self.licenses.page_size == 0 {
            return Err(ConfigError::Invalid(config::ConfigError::Message(
                "licenses.page_size must be at least 1".to_string(),
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(config::ConfigError::Message(
                "retry.max_attempts must be at least 1".to_string(),
            )));
        }
        Ok(self)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] config::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            ("GITHUB_TOKEN", "ghp_test"),
            ("GITHUB_ENTERPRISE_URL", "https://api.github.com/"),
        ]
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(vars(&required())).unwrap();
        assert_eq!(config.github.token, "ghp_test");
        assert_eq!(config.github.api_version, "2022-11-28");
        assert_eq!(config.server.transport, Transport::Stdio);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8050);
        assert_eq!(config.licenses.page_size, 100);
        assert_eq!(config.licenses.cache_ttl(), Duration::from_secs(10800));
        assert_eq!(config.licenses.max_pages, None);
        assert!(!config.licenses.single_flight);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay_ms, 1000);
    }

    #[test]
    fn test_missing_token_fails() {
        let err = Config::from_vars(vars(&[("GITHUB_ENTERPRISE_URL", "https://x")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar("GITHUB_TOKEN")));
    }

    #[test]
    fn test_missing_url_fails() {
        let err = Config::from_vars(vars(&[("GITHUB_TOKEN", "t")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar("GITHUB_ENTERPRISE_URL")));
    }

    #[test]
    fn test_empty_token_counts_as_missing() {
        let err = Config::from_vars(vars(&[
            ("GITHUB_TOKEN", ""),
            ("GITHUB_ENTERPRISE_URL", "https://x"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar("GITHUB_TOKEN")));
    }

    #[test]
    fn test_transport_and_bind_address() {
        let mut pairs = required();
        pairs.extend([("TRANSPORT", "SSE"), ("HOST", "127.0.0.1"), ("PORT", "9000")]);
        let config = Config::from_vars(vars(&pairs)).unwrap();
        assert_eq!(config.server.transport, Transport::Sse);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_invalid_port_fails() {
        let mut pairs = required();
        pairs.push(("PORT", "not-a-port"));
        assert!(matches!(
            Config::from_vars(vars(&pairs)),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_prefixed_overrides() {
        let mut pairs = required();
        pairs.extend([
            ("GHE_MCP__LICENSES__MAX_PAGES", "25"),
            ("GHE_MCP__LICENSES__SINGLE_FLIGHT", "true"),
            ("GHE_MCP__RETRY__BASE_DELAY_MS", "10"),
        ]);
        let config = Config::from_vars(vars(&pairs)).unwrap();
        assert_eq!(config.licenses.max_pages, Some(25));
        assert!(config.licenses.single_flight);
        assert_eq!(config.retry.base_delay_ms, 10);
    }

    #[test]
    fn test_consumed_licenses_url() {
        let mut github = GithubConfig {
            api_url: "https://api.github.com/".to_string(),
            ..GithubConfig::default()
        };
        assert_eq!(
            github.consumed_licenses_url(),
            "https://api.github.com/consumed-licenses"
        );

        github.enterprise = Some("octo-corp".to_string());
        assert_eq!(
            github.consumed_licenses_url(),
            "https://api.github.com/enterprises/octo-corp/consumed-licenses"
        );
    }
}
