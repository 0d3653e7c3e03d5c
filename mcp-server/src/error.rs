//! Error types for the MCP server.

use ghe_mcp_common::LookupError;

/// Error types for GitHub queries.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Retryable failure that persisted through every attempt. `status` is
    /// `None` when the request never produced a response.
    #[error("Request failed after {attempts} attempts{}: {detail}", status_suffix(.status))]
    TransientRequestFailure {
        attempts: u32,
        status: Option<u16>,
        detail: String,
    },

    /// Non-retryable HTTP status, e.g. 404 when the enterprise plan does not
    /// expose the endpoint.
    #[error("GitHub API error: {status} - {body}")]
    RequestFailure { status: u16, body: String },

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Pagination stopped after {0} pages: the API kept returning a next link")]
    PaginationLimitExceeded(u32),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {})", s)).unwrap_or_default()
}

impl From<LookupError> for Error {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::UserNotFound(username) => Error::UserNotFound(username),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_failure_message_with_status() {
        let err = Error::TransientRequestFailure {
            attempts: 3,
            status: Some(503),
            detail: "unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Request failed after 3 attempts (status 503): unavailable"
        );
    }

    #[test]
    fn test_transient_failure_message_without_status() {
        let err = Error::TransientRequestFailure {
            attempts: 3,
            status: None,
            detail: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Request failed after 3 attempts: connection refused"
        );
    }

    #[test]
    fn test_lookup_error_conversion() {
        let err: Error = LookupError::UserNotFound("ghost".to_string()).into();
        assert!(matches!(err, Error::UserNotFound(ref u) if u == "ghost"));
        assert_eq!(err.to_string(), "User not found: ghost");
    }
}
