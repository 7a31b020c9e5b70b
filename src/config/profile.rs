//! Sentry connection profile.

use serde::{Deserialize, Serialize};

use super::{ConfigError, Result};
use crate::api::DEFAULT_HOST;

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

/// A Sentry profile configuration.
///
/// Profiles store connection details for a Sentry instance.
/// Access tokens are stored separately in the OS keychain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    /// The name of this profile.
    ///
    /// Must be non-empty and unique across all profiles.
    pub name: String,

    /// The Sentry host as `host[:port]`, without scheme or path.
    #[serde(default = "default_host")]
    pub host: String,

    /// Organization used when a command does not name one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_organization: Option<String>,
}

impl Profile {
    /// Create a new profile.
    pub fn new(name: String, host: String, default_organization: Option<String>) -> Self {
        Self {
            name,
            host,
            default_organization,
        }
    }

    /// Validate this profile.
    ///
    /// Checks that:
    /// - The name is non-empty and has no whitespace
    /// - The host is non-empty and is a bare `host[:port]`
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError::ValidationError` with details if validation fails.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "profile name cannot be empty".to_string(),
            ));
        }

        if self.name.contains(char::is_whitespace) {
            return Err(ConfigError::ValidationError(format!(
                "profile name '{}' cannot contain whitespace",
                self.name
            )));
        }

        if self.host.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "profile '{}': host cannot be empty",
                self.name
            )));
        }

        if self.host.contains("://") {
            return Err(ConfigError::ValidationError(format!(
                "profile '{}': host '{}' must not include a scheme",
                self.name, self.host
            )));
        }

        if self.host.contains('/') || self.host.contains(char::is_whitespace) {
            return Err(ConfigError::ValidationError(format!(
                "profile '{}': host '{}' must be a bare host[:port]",
                self.name, self.host
            )));
        }

        Ok(())
    }
}
