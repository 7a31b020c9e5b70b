//! API error types for the Sentry client.

use thiserror::Error;

use super::schema::ValidationError;

/// Errors that can occur when interacting with the Sentry API.
///
/// The variants fall into three classes a caller can branch on:
/// the remote service rejected the request ([`ApiError::Api`]), the remote
/// service answered with something this client does not understand
/// ([`ApiError::Validation`]), or the request never produced a usable answer
/// (transport-class variants, see [`ApiError::is_transport`]).
#[derive(Debug, Error)]
pub enum ApiError {
    /// The remote service reported a well-formed failure.
    #[error("{message}")]
    Api {
        /// HTTP status code of the response.
        status: u16,
        /// The `detail` message, possibly rewritten for clarity.
        message: String,
    },

    /// A 2xx response whose body does not match the expected contract.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A non-2xx response whose body carries no usable error contract.
    #[error("{0}")]
    Transport(String),

    /// Network or HTTP error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A host or region URL that cannot form a request URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Keyring error when storing/retrieving tokens.
    #[error("Keyring error: {0}")]
    Keyring(String),
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// Build the generic error used when a failed response has no `detail`.
    pub fn transport(status: u16, status_text: &str, body: &str) -> Self {
        ApiError::Transport(format!(
            "API request failed: {} {}\n{}",
            status, status_text, body
        ))
    }

    /// The remote HTTP status, when the error came from a well-formed failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the remote service rejected the request.
    pub fn is_remote(&self) -> bool {
        matches!(self, ApiError::Api { .. })
    }

    /// Whether a 2xx response failed schema validation.
    pub fn is_validation(&self) -> bool {
        matches!(self, ApiError::Validation(_))
    }

    /// Whether the request failed before producing a usable answer.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ApiError::Transport(_) | ApiError::Network(_) | ApiError::InvalidUrl(_)
        )
    }
}
