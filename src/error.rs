//! Centralized error types for sentry-access.
//!
//! This module provides a unified error hierarchy for the application with
//! user-friendly error messages. All error types use `thiserror` for
//! ergonomic error handling.

use thiserror::Error;

use crate::api::error::ApiError;
use crate::config::ConfigError;
use crate::resolver::ResolveError;

/// The main application error type.
///
/// This enum aggregates all error types that can occur in sentry-access,
/// providing user-friendly error messages while preserving the underlying
/// error context for debugging.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration-related errors.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// API-related errors.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// An issue reference that could not be resolved.
    #[error("{0}")]
    Resolve(#[from] ResolveError),

    /// IO errors (file system, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with a message.
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Create a generic error.
    pub fn other(msg: impl Into<String>) -> Self {
        AppError::Other(msg.into())
    }

    /// Get a user-friendly message for display.
    ///
    /// Remote failures keep the server's message, since it is usually the
    /// most specific explanation available.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Config(e) => match e {
                ConfigError::NoConfigDir => {
                    "Could not find configuration directory. Please check your system settings."
                        .to_string()
                }
                ConfigError::CreateDirError(_) => {
                    "Could not create configuration directory. Check file permissions.".to_string()
                }
                ConfigError::ReadError(_) => {
                    "Could not read configuration file. Please check the file exists and is readable.".to_string()
                }
                ConfigError::WriteError(_) => {
                    "Could not save configuration. Please check file permissions.".to_string()
                }
                ConfigError::ParseError(_) => {
                    "Configuration file is invalid. Please check the file format.".to_string()
                }
                ConfigError::SerializeError(_) => {
                    "Could not save configuration. Internal error.".to_string()
                }
                ConfigError::ValidationError(msg) => format!("Configuration error: {}", msg),
                ConfigError::ProfileNotFound(name) => {
                    format!("Profile '{}' not found.", name)
                }
            },
            AppError::Api(e) => match e {
                ApiError::Api { status, message } => {
                    format!("Sentry rejected the request ({}): {}", status, message)
                }
                ApiError::Validation(v) => format!(
                    "Unexpected response from Sentry ({} field(s) did not match).",
                    v.errors.len()
                ),
                ApiError::Transport(msg) => msg.clone(),
                ApiError::Network(_) => {
                    "Connection failed. Please check your internet connection.".to_string()
                }
                ApiError::InvalidUrl(url) => format!("Invalid Sentry URL: {}", url),
                ApiError::Keyring(_) => {
                    "Could not access secure storage. Please log in again.".to_string()
                }
            },
            AppError::Resolve(e) => e.to_string(),
            AppError::Io(_) => "A file operation failed. Please check file permissions.".to_string(),
            AppError::Other(msg) => msg.clone(),
        }
    }

    /// Whether the user can fix this by changing the request.
    ///
    /// True for remote rejections and transport failures; validation and
    /// internal failures are not the caller's to fix.
    pub fn is_actionable(&self) -> bool {
        match self {
            AppError::Api(e) => e.is_remote() || e.is_transport(),
            AppError::Resolve(_) => true,
            _ => false,
        }
    }

    /// Get a suggested action for the user.
    pub fn suggested_action(&self) -> Option<&'static str> {
        match self {
            AppError::Api(ApiError::Api { status: 401, .. }) => {
                Some("Run 'sentry-access login' or set SENTRY_ACCESS_TOKEN.")
            }
            AppError::Api(ApiError::Api { status: 403, .. }) => {
                Some("Check that your token has the required scopes for this organization.")
            }
            AppError::Api(ApiError::Api { status: 404, .. }) => {
                Some("Check the organization slug and identifier, or pass --region-url.")
            }
            AppError::Api(ApiError::Network(_)) | AppError::Api(ApiError::InvalidUrl(_)) => {
                Some("Check your internet connection and Sentry host.")
            }
            AppError::Api(ApiError::Keyring(_)) => Some("Run 'sentry-access login' again."),
            AppError::Config(ConfigError::ProfileNotFound(_)) => {
                Some("Run 'sentry-access login --profile <name>' to create it.")
            }
            AppError::Resolve(ResolveError::MissingOrganization) => {
                Some("Pass --org or set default_organization in your profile.")
            }
            _ => None,
        }
    }
}

/// Result type for application operations.
pub type Result<T> = std::result::Result<T, AppError>;
