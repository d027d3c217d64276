//! Error types for the JumpServer provider.

use reqwest::StatusCode;
use thiserror::Error;

use crate::types::ResourceKind;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors surfaced by provider operations.
///
/// Nothing is retried or rolled back locally: every error reaches the
/// caller of the operation that triggered it.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Missing base URL, missing credentials, or an unconfigured provider.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Token login failed or a request could not be signed.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Network or connection failure, or a lookup collection that could not be listed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The API answered with a status the operation does not accept.
    #[error("{operation} {kind} failed: HTTP {status}")]
    Api {
        /// Record kind the request addressed.
        kind: String,
        /// The operation that issued the request.
        operation: &'static str,
        /// The status returned by the server.
        status: StatusCode,
    },

    /// A response body lacked an expected field or had the wrong shape.
    #[error("Schema error: {0}")]
    Schema(String),

    /// A name lookup matched no entry.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource configuration failed schema validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A state document could not be converted to or from JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProviderError {
    /// Build an [`ProviderError::Api`] for a record kind.
    pub fn api(kind: ResourceKind, operation: &'static str, status: StatusCode) -> Self {
        Self::Api {
            kind: kind.to_string(),
            operation,
            status,
        }
    }

    /// Get the error message as a string.
    pub fn message(&self) -> String {
        match self {
            Self::Configuration(msg)
            | Self::Auth(msg)
            | Self::Schema(msg)
            | Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::UnknownResource(msg)
            | Self::Transport(msg) => msg.clone(),
            Self::Serialization(err) => err.to_string(),
            Self::Api { .. } => self.to_string(),
        }
    }

    /// The HTTP status carried by an API error.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this error is a failed name lookup.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::NotFound("domain 'prod' not found".to_string());
        assert_eq!(format!("{}", err), "Not found: domain 'prod' not found");

        let err = ProviderError::Configuration("missing base URL".to_string());
        assert_eq!(format!("{}", err), "Configuration error: missing base URL");

        let err = ProviderError::UnknownResource("jumpserver_vm".to_string());
        assert_eq!(format!("{}", err), "Unknown resource type: jumpserver_vm");
    }

    #[test]
    fn test_api_error_carries_status() {
        let err = ProviderError::api(ResourceKind::Host, "create", StatusCode::BAD_REQUEST);
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(
            format!("{}", err),
            "create host failed: HTTP 400 Bad Request"
        );
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_message_method() {
        let err = ProviderError::Auth("no token in response".to_string());
        assert_eq!(err.message(), "no token in response");

        let err = ProviderError::Schema("missing field `id`".to_string());
        assert_eq!(err.message(), "missing field `id`");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_not_found_is_distinct() {
        assert!(ProviderError::NotFound("node '/'".to_string()).is_not_found());
        assert!(!ProviderError::Validation("bad".to_string()).is_not_found());
    }
}
