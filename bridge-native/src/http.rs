//! Reqwest-backed HTTP client for native hosts.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse},
};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Retry tuning for transport-level failures.
///
/// Applies only to attempts that never produced a response: connect errors,
/// timeouts, and broken reads. Delivered statuses are returned as-is, so
/// status-based policy stays with the caller.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub base_delay: Duration,
    /// Cap on the per-attempt delay.
    pub max_delay: Duration,
    /// Double the delay after each failed attempt.
    pub use_exponential_backoff: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            use_exponential_backoff: true,
        }
    }
}

/// Reqwest-based [`HttpClient`] with connection pooling, TLS, and internal
/// retry of transport failures.
pub struct ReqwestHttpClient {
    client: Client,
    policy: RetryPolicy,
}

/// Outcome of a single wire attempt.
enum Attempt {
    Done(HttpResponse),
    Retryable(BridgeError),
    Fatal(BridgeError),
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_max_idle_per_host(10)
            .user_agent("audiobook-platform-core/0.1.0")
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            policy: RetryPolicy::default(),
        }
    }

    /// Wraps a preconfigured reqwest client, for hosts that manage their own
    /// pool or proxy settings.
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }

    fn build_request(&self, request: HttpRequest) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .request(Self::convert_method(request.method), &request.url);

        for (key, value) in request.headers {
            req = req.header(key, value);
        }
        if let Some(body) = request.body {
            req = req.body(body);
        }
        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        req
    }

    /// Issue the request once and classify the outcome.
    async fn attempt(&self, request: HttpRequest) -> Attempt {
        match self.build_request(request).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let headers: HashMap<String, String> = response
                    .headers()
                    .iter()
                    .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
                    .collect();

                // The body may be partially consumed at this point, so a
                // failed read is not repeated.
                match response.bytes().await {
                    Ok(body) => Attempt::Done(HttpResponse {
                        status,
                        headers,
                        body,
                    }),
                    Err(e) => Attempt::Fatal(BridgeError::Transport(format!(
                        "response body read failed: {e}"
                    ))),
                }
            }
            Err(e) if e.is_timeout() => {
                Attempt::Retryable(BridgeError::Transport("request timed out".to_string()))
            }
            Err(e) if e.is_connect() => {
                Attempt::Retryable(BridgeError::Transport(format!("connection failed: {e}")))
            }
            Err(e) => Attempt::Retryable(BridgeError::Transport(e.to_string())),
        }
    }

    fn retry_delay(policy: &RetryPolicy, completed_attempts: u32) -> Duration {
        if policy.use_exponential_backoff {
            let exponential = policy.base_delay * 2u32.pow(completed_attempts.saturating_sub(1));
            exponential.min(policy.max_delay)
        } else {
            policy.base_delay
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut last_error = None;

        for attempt in 1..=self.policy.max_attempts {
            debug!(
                attempt,
                max_attempts = self.policy.max_attempts,
                url = %request.url,
                "Executing HTTP request"
            );

            match self.attempt(request.clone()).await {
                Attempt::Done(response) => return Ok(response),
                Attempt::Fatal(e) => return Err(e),
                Attempt::Retryable(e) => {
                    warn!(error = %e, attempt, "HTTP request failed");
                    last_error = Some(e);
                }
            }

            if attempt < self.policy.max_attempts {
                let delay = Self::retry_delay(&self.policy, attempt);
                debug!(delay_ms = delay.as_millis(), "Retrying after delay");
                sleep(delay).await;
            }
        }

        Err(last_error
            .unwrap_or_else(|| BridgeError::Transport("all attempts exhausted".to_string())))
    }

    async fn download_stream(
        &self,
        url: String,
    ) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
        use futures_util::TryStreamExt;

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| BridgeError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BridgeError::Transport(format!(
                "download failed with HTTP {}",
                response.status()
            )));
        }

        let stream = response.bytes_stream().map_err(std::io::Error::other);
        let reader = tokio_util::io::StreamReader::new(stream);

        Ok(Box::new(reader))
    }
}
