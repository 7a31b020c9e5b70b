//! HTTP execution for the Sentry client.
//!
//! The client builds a fully-formed [`HttpRequest`] and hands it to a
//! [`Transport`]; the transport only moves bytes. Status handling, error
//! normalization and schema validation stay in the client, so tests can
//! swap the network for a recorded route table.

use std::future::Future;
use std::time::Duration;

use reqwest::{header, Client, Method};
use tracing::{debug, instrument};

use super::error::{ApiError, Result};

/// Connect timeout for the underlying HTTP client.
///
/// Only bounds establishing the connection; whole-request deadlines are
/// the caller's responsibility.
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// A request ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL including the query string.
    pub url: String,
    /// Header name/value pairs, in insertion order.
    pub headers: Vec<(String, String)>,
    /// JSON-encoded body for mutating calls.
    pub body: Option<String>,
}

impl HttpRequest {
    /// Look up a header value by (case-insensitive) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response with its body fully read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Numeric status code.
    pub status: u16,
    /// Canonical reason phrase, e.g. `Not Found`.
    pub status_text: String,
    /// Raw body text.
    pub body: String,
}

impl HttpResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes HTTP requests (enables mocking in tests).
pub trait Transport: Send + Sync {
    /// Send the request and read the whole body.
    ///
    /// Only network-level failures are errors; every status code, including
    /// 4xx and 5xx, is returned as a response.
    fn execute(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send;
}

/// [`Transport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build the transport with the crate's user agent.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(concat!("sentry-access/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::Network)?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self.client.request(request.method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.header(header::ACCEPT, "application/json").send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "Response received");

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Route-table transport for tests.

    use std::sync::Mutex;

    use super::*;

    /// Replies from a table of `(url prefix, response)` routes and records
    /// every request it sees.
    #[derive(Debug, Default)]
    pub struct MockTransport {
        routes: Mutex<Vec<(String, HttpResponse)>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Reply to URLs starting with `prefix` with a JSON body.
        pub fn with_json(self, prefix: &str, status: u16, body: serde_json::Value) -> Self {
            self.with_text(prefix, status, &body.to_string())
        }

        /// Reply to URLs starting with `prefix` with a raw body.
        pub fn with_text(self, prefix: &str, status: u16, body: &str) -> Self {
            let status_text = reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or_default()
                .to_string();
            self.routes
                .lock()
                .unwrap()
                .push((
                    prefix.to_string(),
                    HttpResponse {
                        status,
                        status_text,
                        body: body.to_string(),
                    },
                ));
            self
        }

        /// Requests seen so far, in order.
        pub fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }

        /// The single request seen so far.
        pub fn only_request(&self) -> HttpRequest {
            let requests = self.requests();
            assert_eq!(requests.len(), 1, "requests: {:#?}", requests);
            requests.into_iter().next().unwrap()
        }
    }

    impl Transport for MockTransport {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.requests.lock().unwrap().push(request.clone());
            // Longest matching prefix wins so specific routes can shadow broad ones.
            let routes = self.routes.lock().unwrap();
            routes
                .iter()
                .filter(|(prefix, _)| request.url.starts_with(prefix.as_str()))
                .max_by_key(|(prefix, _)| prefix.len())
                .map(|(_, response)| response.clone())
                .ok_or_else(|| ApiError::Transport(format!("no mock route for {}", request.url)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = HttpRequest {
            method: Method::GET,
            url: "https://sentry.io/api/0/auth/".to_string(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: None,
        };
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("authorization"), None);
    }

    #[test]
    fn test_is_success_range() {
        let mut response = HttpResponse {
            status: 204,
            status_text: "No Content".to_string(),
            body: String::new(),
        };
        assert!(response.is_success());
        response.status = 302;
        assert!(!response.is_success());
        response.status = 199;
        assert!(!response.is_success());
    }

    #[test]
    fn test_reqwest_transport_builds() {
        assert!(ReqwestTransport::new().is_ok());
    }
}
