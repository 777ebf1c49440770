//! Error types for catalog access.

use std::time::Duration;

/// Errors returned by a [`CatalogClient`](super::CatalogClient).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP transport error (connection, DNS, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Error raised inside the retry middleware stack.
    #[error("HTTP request error: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    /// Asset or endpoint not found (404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or invalid token (401).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Token lacks permission on the asset (403).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Rate limited (429) after retries were exhausted.
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Any other non-success status.
    #[error("Service error ({status}): {message}")]
    Status { status: u16, message: String },

    /// The service answered, but not in the expected shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Client configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure injected or reported by a non-HTTP catalog.
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

impl ClientError {
    /// True for responses that arrived but could not be interpreted.
    pub fn is_malformed(&self) -> bool {
        matches!(self, ClientError::MalformedResponse(_))
    }
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_is_distinguished() {
        assert!(ClientError::MalformedResponse("no tables".into()).is_malformed());
        assert!(!ClientError::Unavailable("down".into()).is_malformed());
    }

    #[test]
    fn display_includes_status() {
        let err = ClientError::Status {
            status: 502,
            message: "bad gateway".into(),
        };
        assert_eq!(err.to_string(), "Service error (502): bad gateway");
    }
}
