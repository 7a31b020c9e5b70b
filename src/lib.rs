//! sentry-access - a typed, region-aware client for the Sentry REST API.
//!
//! The [`api`] module holds the client, its response contracts and error
//! taxonomy; [`resolver`] turns loose issue references into exact ones.
//! [`config`], [`logging`] and [`cli`] support the `sentry-access` binary.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod resolver;

pub use api::{ApiError, RequestOptions, SentryClient};
pub use error::AppError;
pub use resolver::{resolve, IssueParams, IssueRef, ResolveError};
