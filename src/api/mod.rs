//! Sentry API client, contracts and errors.
//!
//! This module provides the interface for communicating with the Sentry REST API.

pub mod auth;
pub mod client;
pub mod error;
pub mod params;
pub mod schema;
pub mod transport;
pub mod types;

pub use auth::AccessToken;
pub use client::{ProjectWithKey, RequestOptions, SentryClient, DEFAULT_HOST};
pub use error::ApiError;
pub use schema::{FieldError, ValidationError};
pub use transport::{ReqwestTransport, Transport};
