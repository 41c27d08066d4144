//! HTTP transport abstraction.
//!
//! The request/response pair models what the catalog connectors need from a
//! host HTTP stack: method, URL, headers, optional body, and a per-request
//! timeout, with the response body fully read into memory. Large payloads
//! go through [`HttpClient::download_stream`] instead.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

/// One HTTP request, built up with chained setters.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use bridge_traits::http::{HttpMethod, HttpRequest};
///
/// let request = HttpRequest::new(HttpMethod::Get, "https://shelf.example.com/api/me")
///     .bearer_token("secret")
///     .header("Accept", "application/json")
///     .timeout(Duration::from_secs(30));
/// assert!(request.headers.contains_key("Authorization"));
/// ```
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    /// Overrides the client's default timeout for this request.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the `Authorization` header from a bearer token.
    pub fn bearer_token(self, token: impl Into<String>) -> Self {
        self.header("Authorization", format!("Bearer {}", token.into()))
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

/// A fully-read HTTP response.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// True for 5xx statuses.
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

/// Host HTTP stack.
///
/// A response comes back for every status code; only transport-level
/// failures surface as errors. Implementations may retry those transport
/// failures internally, but must never swallow a delivered status, so
/// callers keep full authority over status-based policy such as rate-limit
/// backoff.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Executes the request and reads the full response body.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Transport`](crate::error::BridgeError) when
    /// the connection fails, the request times out, or the body cannot be
    /// read.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Opens a streaming download for a payload that should not be buffered
    /// whole, such as cover art.
    async fn download_stream(
        &self,
        url: String,
    ) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>>;
}
