//! Configuration management for sentry-access.
//!
//! This module handles loading, saving, and managing user configuration
//! including profiles and application settings, and combines them with
//! environment overrides and stored tokens into a [`Connection`].

mod profile;
mod settings;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

pub use profile::Profile;
pub use settings::Settings;

use crate::api::{auth, DEFAULT_HOST};

/// Directory name under the platform config directory.
const APP_DIR: &str = "sentry-access";

/// Config file name.
const CONFIG_FILE: &str = "config.toml";

/// Access token override.
pub const ENV_ACCESS_TOKEN: &str = "SENTRY_ACCESS_TOKEN";

/// Older name of [`ENV_ACCESS_TOKEN`], still honored.
pub const ENV_AUTH_TOKEN: &str = "SENTRY_AUTH_TOKEN";

/// Host override.
pub const ENV_HOST: &str = "SENTRY_HOST";

/// Errors from loading, saving or resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine configuration directory")]
    NoConfigDir,

    #[error("failed to create configuration directory: {0}")]
    CreateDirError(#[source] std::io::Error),

    #[error("failed to read configuration file: {0}")]
    ReadError(#[source] std::io::Error),

    #[error("failed to write configuration file: {0}")]
    WriteError(#[source] std::io::Error),

    #[error("failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// A profile failed validation.
    #[error("invalid configuration: {0}")]
    ValidationError(String),

    #[error("profile '{0}' not found")]
    ProfileNotFound(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// The on-disk configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

/// Everything needed to build a client.
#[derive(Clone, PartialEq, Eq)]
pub struct Connection {
    /// The profile the settings came from, if any.
    pub profile_name: Option<String>,
    /// Default `host[:port]`.
    pub host: String,
    /// Bearer token; absent means unauthenticated requests.
    pub access_token: Option<String>,
    /// Organization used when a command does not name one.
    pub default_organization: Option<String>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("profile_name", &self.profile_name)
            .field("host", &self.host)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "****"),
            )
            .field("default_organization", &self.default_organization)
            .finish()
    }
}

impl Config {
    /// Path of the config file in the platform config directory.
    ///
    /// - Linux: `~/.config/sentry-access/config.toml`
    /// - macOS: `~/Library/Application Support/sentry-access/config.toml`
    pub fn config_path() -> Result<PathBuf> {
        let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(base.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load the config file, or an empty config if it does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from an explicit path. A missing file yields the default config.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        debug!(
            path = %path.display(),
            profiles = config.profiles.len(),
            "Config loaded"
        );
        Ok(config)
    }

    /// Save to the platform config file.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::CreateDirError)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(ConfigError::WriteError)?;
        info!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Validate every profile and check names are unique.
    pub fn validate(&self) -> Result<()> {
        for (i, profile) in self.profiles.iter().enumerate() {
            profile.validate()?;
            if self.profiles[..i].iter().any(|p| p.name == profile.name) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate profile name '{}'",
                    profile.name
                )));
            }
        }
        Ok(())
    }

    /// Find a profile by name.
    pub fn get_profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// The profile named by `settings.default_profile`, else the only
    /// profile when there is exactly one.
    pub fn get_default_profile(&self) -> Option<&Profile> {
        match self.settings.default_profile {
            Some(ref name) => self.get_profile(name),
            None if self.profiles.len() == 1 => self.profiles.first(),
            None => None,
        }
    }

    /// Add a profile, replacing one with the same name.
    pub fn upsert_profile(&mut self, profile: Profile) -> Result<()> {
        profile.validate()?;
        match self.profiles.iter_mut().find(|p| p.name == profile.name) {
            Some(existing) => *existing = profile,
            None => self.profiles.push(profile),
        }
        Ok(())
    }

    /// Remove a profile. Clears the default if it pointed at it.
    pub fn remove_profile(&mut self, name: &str) -> Result<Profile> {
        let index = self
            .profiles
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| ConfigError::ProfileNotFound(name.to_string()))?;
        if self.settings.default_profile.as_deref() == Some(name) {
            self.settings.default_profile = None;
        }
        Ok(self.profiles.remove(index))
    }

    /// Combine the selected profile, the environment and the keyring.
    ///
    /// Precedence, highest first: environment, profile, built-in default.
    /// The token comes from `SENTRY_ACCESS_TOKEN`, then `SENTRY_AUTH_TOKEN`,
    /// then the keyring entry of the profile. A missing token is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ProfileNotFound` if `profile_name` (or the
    /// configured default) does not exist.
    pub fn resolve_connection(&self, profile_name: Option<&str>) -> Result<Connection> {
        self.resolve_connection_with(
            profile_name,
            |key| std::env::var(key).ok(),
            |profile| match auth::get_token(profile) {
                Ok(token) => Some(token),
                Err(e) => {
                    debug!(profile, "No stored token: {}", e);
                    None
                }
            },
        )
    }

    /// [`Config::resolve_connection`] with explicit environment and token
    /// lookups.
    pub fn resolve_connection_with<E, K>(
        &self,
        profile_name: Option<&str>,
        env: E,
        stored_token: K,
    ) -> Result<Connection>
    where
        E: Fn(&str) -> Option<String>,
        K: Fn(&str) -> Option<String>,
    {
        let profile = match profile_name {
            Some(name) => Some(
                self.get_profile(name)
                    .ok_or_else(|| ConfigError::ProfileNotFound(name.to_string()))?,
            ),
            None => match self.settings.default_profile {
                Some(ref name) if self.get_profile(name).is_none() => {
                    return Err(ConfigError::ProfileNotFound(name.clone()))
                }
                _ => self.get_default_profile(),
            },
        };

        let env_value = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let host = env_value(ENV_HOST)
            .or_else(|| profile.map(|p| p.host.clone()))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let access_token = env_value(ENV_ACCESS_TOKEN)
            .or_else(|| {
                let legacy = env_value(ENV_AUTH_TOKEN);
                if legacy.is_some() {
                    warn!("{} is deprecated, use {}", ENV_AUTH_TOKEN, ENV_ACCESS_TOKEN);
                }
                legacy
            })
            .or_else(|| profile.and_then(|p| stored_token(&p.name)));

        Ok(Connection {
            profile_name: profile.map(|p| p.name.clone()),
            host,
            access_token,
            default_organization: profile.and_then(|p| p.default_organization.clone()),
        })
    }
}
