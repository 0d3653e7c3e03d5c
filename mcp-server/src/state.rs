//! Shared application state.

use std::sync::Arc;

use crate::config::{Config, ConfigError};
use crate::github::GitHubClient;
use crate::licenses::{LicenseService, LicenseSource};

/// Shared application state passed to every request handler.
pub struct AppState {
    pub config: Config,
    pub github: Arc<GitHubClient>,
    pub licenses: LicenseService,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let github = Arc::new(GitHubClient::new(
            &config.github,
            &config.licenses,
            &config.retry,
        )?);
        let licenses = LicenseService::new(
            github.clone() as Arc<dyn LicenseSource>,
            config.licenses.cache_ttl(),
            config.licenses.single_flight,
        );

        Ok(Self {
            config,
            github,
            licenses,
        })
    }
}
