//! Access-token handling for the Sentry API.
//!
//! Requests authenticate with a bearer token. Tokens are stored in the OS
//! keyring, never in the config file.

use std::fmt;

use super::error::{ApiError, Result};

/// The keyring service name for stored access tokens.
const KEYRING_SERVICE: &str = "sentry-access";

/// A bearer access token.
///
/// The raw token is kept only inside the prebuilt header value, and `Debug`
/// never prints it.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    auth_header: String,
}

impl AccessToken {
    /// Wrap a raw token.
    pub fn new(token: &str) -> Self {
        Self {
            auth_header: build_auth_header(token),
        }
    }

    /// The complete `Bearer ...` header value.
    pub fn header_value(&self) -> &str {
        &self.auth_header
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(****)")
    }
}

fn build_auth_header(token: &str) -> String {
    format!("Bearer {}", token.trim())
}

fn entry(profile_name: &str) -> Result<keyring::Entry> {
    keyring::Entry::new(KEYRING_SERVICE, profile_name)
        .map_err(|e| ApiError::Keyring(format!("failed to access keyring: {}", e)))
}

/// Store an access token in the OS keyring.
///
/// # Arguments
///
/// * `profile_name` - The profile name to use as the keyring username
/// * `token` - The access token to store
pub fn store_token(profile_name: &str, token: &str) -> Result<()> {
    entry(profile_name)?
        .set_password(token.trim())
        .map_err(|e| ApiError::Keyring(format!("failed to store token: {}", e)))
}

/// Retrieve the access token stored for a profile.
pub fn get_token(profile_name: &str) -> Result<String> {
    entry(profile_name)?
        .get_password()
        .map_err(|e| ApiError::Keyring(format!("failed to retrieve token: {}", e)))
}

/// Delete the access token stored for a profile.
pub fn delete_token(profile_name: &str) -> Result<()> {
    entry(profile_name)?
        .delete_password()
        .map_err(|e| ApiError::Keyring(format!("failed to delete token: {}", e)))
}
