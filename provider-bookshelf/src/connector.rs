//! Bookshelf server connector
//!
//! `CatalogProvider` implementation backed by a self-hosted Bookshelf
//! audiobook server. Speaks the server's JSON API over the platform
//! `HttpClient` bridge: bearer-token auth, paginated item listing with
//! server-side search, per-user playback progress lookup, and streamed
//! cover downloads.

use async_trait::async_trait;
use bridge_traits::catalog::{CatalogItem, CatalogProvider, CatalogResult, ProgressSnapshot};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use chrono::DateTime;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::{BookshelfError, Result};
use crate::types::{ItemPayload, ItemsPageResponse, ProgressPayload};

/// Per-request timeout applied to every API call
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Total attempts per request, the first one included
const MAX_ATTEMPTS: u32 = 3;

/// Connection settings for one Bookshelf server and library.
#[derive(Clone)]
pub struct BookshelfConfig {
    /// Server origin, e.g. `https://shelf.example.com`
    pub base_url: String,
    /// Library whose items are listed
    pub library_id: String,
    /// API token sent as a bearer credential
    pub token: String,
}

impl BookshelfConfig {
    /// Creates a config, normalizing away a trailing slash on the origin.
    pub fn new(
        base_url: impl Into<String>,
        library_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            library_id: library_id.into(),
            token: token.into(),
        }
    }
}

impl fmt::Debug for BookshelfConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BookshelfConfig")
            .field("base_url", &self.base_url)
            .field("library_id", &self.library_id)
            .field("token", &"***")
            .finish()
    }
}

/// Client for the Bookshelf server API.
pub struct BookshelfConnector {
    http_client: Arc<dyn HttpClient>,
    config: BookshelfConfig,
}

impl BookshelfConnector {
    /// Creates a connector over the given HTTP bridge.
    pub fn new(http_client: Arc<dyn HttpClient>, config: BookshelfConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    fn items_url(&self, page: u32, limit: u32, query: Option<&str>) -> String {
        // The sync layer counts pages from 1; the server counts from 0.
        let mut url = format!(
            "{}/api/libraries/{}/items?page={}&limit={}",
            self.config.base_url,
            self.config.library_id,
            page.saturating_sub(1),
            limit
        );
        if let Some(query) = query {
            url.push_str("&search=");
            url.push_str(&urlencoding::encode(query));
        }
        url
    }

    fn progress_url(&self, item_id: &str) -> String {
        format!("{}/api/me/progress/{}", self.config.base_url, item_id)
    }

    fn authorized_get(&self, url: String) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, url)
            .bearer_token(self.config.token.clone())
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT)
    }

    /// Joins a server-relative cover path onto the configured origin.
    fn cover_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.config.base_url, path.trim_start_matches('/'))
    }

    /// Converts a wire item into the provider-neutral catalog record.
    fn convert_item(&self, payload: ItemPayload) -> CatalogItem {
        let media = payload.media;
        let metadata = media.metadata;
        CatalogItem {
            id: payload.id,
            title: metadata.title.unwrap_or_default(),
            author: metadata.author_name,
            series_name: metadata.series_name,
            series_sequence: metadata.series_sequence,
            collection_name: metadata.collection_name,
            collection_sequence: metadata.collection_sequence,
            cover_ref: media.cover_path.map(|path| self.cover_url(&path)),
            updated_at: payload.updated_at.and_then(DateTime::from_timestamp_millis),
            duration_ms: media.duration.map(|secs| (secs * 1000.0) as i64),
        }
    }

    /// Opens a byte stream of the item's cover image.
    ///
    /// The stream comes straight off the socket; callers own buffering and
    /// decoding. The token rides as a query credential because asset links
    /// carry no headers.
    #[instrument(skip_all, fields(item_id = %item_id))]
    pub async fn download_cover(
        &self,
        item_id: &str,
    ) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
        let url = format!(
            "{}/api/items/{}/cover?token={}",
            self.config.base_url, item_id, self.config.token
        );
        let reader = self.http_client.download_stream(url).await?;
        debug!("Cover stream opened");
        Ok(reader)
    }

    /// Executes `request`, retrying transient failures.
    ///
    /// 429 and 5xx responses and bridge transport errors retry with
    /// exponential backoff, up to [`MAX_ATTEMPTS`] total attempts. Any other
    /// response is terminal and handed back for the caller to interpret,
    /// 4xx included.
    #[instrument(skip_all, fields(url = %request.url))]
    async fn execute_with_retry(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut attempt = 0;
        loop {
            match self.http_client.execute(request.clone()).await {
                Ok(response) if response.status == 429 || response.is_server_error() => {
                    attempt += 1;
                    if attempt >= MAX_ATTEMPTS {
                        return Err(BookshelfError::ApiError {
                            status_code: response.status,
                            message: format!("request failed after {} attempts", MAX_ATTEMPTS),
                        });
                    }
                    let backoff_ms = 100u64 * 2u64.pow(attempt);
                    warn!(
                        status = response.status,
                        attempt, backoff_ms, "Transient API error, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
                Ok(response) => return Ok(response),
                Err(error) => {
                    attempt += 1;
                    if attempt >= MAX_ATTEMPTS {
                        return Err(BookshelfError::BridgeError(error));
                    }
                    let backoff_ms = 100u64 * 2u64.pow(attempt);
                    warn!(error = %error, attempt, backoff_ms, "Transport error, retrying");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
            }
        }
    }
}

#[async_trait]
impl CatalogProvider for BookshelfConnector {
    #[instrument(skip(self))]
    async fn fetch_page(
        &self,
        page: u32,
        limit: u32,
        query: Option<&str>,
    ) -> CatalogResult<Vec<CatalogItem>> {
        let request = self.authorized_get(self.items_url(page, limit, query));
        let response = self.execute_with_retry(request).await?;

        if !response.is_success() {
            let message = String::from_utf8_lossy(&response.body).to_string();
            return Err(BookshelfError::ApiError {
                status_code: response.status,
                message,
            }
            .into());
        }

        let page_response: ItemsPageResponse = serde_json::from_slice(&response.body)
            .map_err(|e| BookshelfError::ParseError(format!("items page: {}", e)))?;

        debug!(
            fetched = page_response.results.len(),
            total = page_response.total,
            "Fetched catalog page"
        );

        Ok(page_response
            .results
            .into_iter()
            .map(|item| self.convert_item(item))
            .collect())
    }

    #[instrument(skip(self), fields(item_id = %item_id))]
    async fn fetch_progress(&self, item_id: &str) -> CatalogResult<Option<ProgressSnapshot>> {
        let request = self.authorized_get(self.progress_url(item_id));
        let response = self.execute_with_retry(request).await?;

        // A 404 means "never played", which is an answer, not a failure.
        if response.status == 404 {
            debug!("No progress record on the server");
            return Ok(None);
        }
        if !response.is_success() {
            let message = String::from_utf8_lossy(&response.body).to_string();
            return Err(BookshelfError::ApiError {
                status_code: response.status,
                message,
            }
            .into());
        }

        match serde_json::from_slice::<ProgressPayload>(&response.body) {
            Ok(payload) => Ok(Some(payload.into_snapshot())),
            Err(error) => {
                debug!(error = %error, "Unreadable progress payload treated as missing");
                Ok(None)
            }
        }
    }
}
