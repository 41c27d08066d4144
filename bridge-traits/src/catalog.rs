//! Remote Catalog Abstraction
//!
//! Defines the contract between the core and a remote audiobook library
//! server: paginated catalog listing and per-item playback progress lookup.
//! Concrete connectors (e.g. `provider-bookshelf`) implement
//! [`CatalogProvider`] on top of the [`HttpClient`](crate::http::HttpClient)
//! bridge.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One item of the remote catalog (an audiobook, podcast, or ebook).
///
/// This record is owned jointly by the local mirror (persisted form) and the
/// sync coordinator (merge authority). It is only ever mutated by merge
/// operations; consumers treat it as read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Stable, server-assigned identity
    pub id: String,

    /// Display title
    pub title: String,
    /// Author/narrator attribution, if the server provides one
    pub author: Option<String>,

    /// Series grouping
    pub series_name: Option<String>,
    pub series_sequence: Option<String>,

    /// Collection grouping
    pub collection_name: Option<String>,
    pub collection_sequence: Option<String>,

    /// Cover art reference (remote URL or local file reference)
    pub cover_ref: Option<String>,

    /// Last server-side update. Nullable; used as the "recently added" sort key.
    pub updated_at: Option<DateTime<Utc>>,

    /// Total runtime in milliseconds, if known
    pub duration_ms: Option<i64>,
}

impl CatalogItem {
    /// Minimal constructor for the required fields.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: None,
            series_name: None,
            series_sequence: None,
            collection_name: None,
            collection_sequence: None,
            cover_ref: None,
            updated_at: None,
            duration_ms: None,
        }
    }

    /// Runtime in seconds, if a duration is known and positive.
    pub fn duration_secs(&self) -> Option<f64> {
        match self.duration_ms {
            Some(ms) if ms > 0 => Some(ms as f64 / 1000.0),
            _ => None,
        }
    }
}

/// Per-item playback progress as reported by the server.
///
/// Ephemeral: fetched on demand, never persisted by this layer. Servers vary
/// in which fields they populate, so every field is optional; an empty
/// snapshot (the `Default`) is also how unobtainable progress is represented.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Playback position in seconds
    #[serde(default)]
    pub current_time_seconds: Option<f64>,
    /// Item duration in seconds, as known to the progress endpoint
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    /// Completed fraction in `0.0..=1.0`
    #[serde(default)]
    pub progress_ratio: Option<f64>,
    /// Server-side finished marker
    #[serde(default)]
    pub is_finished: bool,
}

/// Errors produced by remote catalog operations
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Network failure, timeout, or non-2xx response
    #[error("Catalog transport failure: {message}")]
    Transport {
        status_code: Option<u16>,
        message: String,
    },

    /// The server answered but the payload could not be decoded
    #[error("Malformed catalog payload: {0}")]
    Decode(String),
}

impl CatalogError {
    /// Transport error without an HTTP status (connection/timeout class)
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            status_code: None,
            message: message.into(),
        }
    }

    /// Transport error carrying the offending HTTP status
    pub fn http_status(status_code: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            status_code: Some(status_code),
            message: message.into(),
        }
    }
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Remote catalog client trait
///
/// Abstracts the library server's read surface used by the sync layer. "Not
/// found" is data, not an error: an out-of-range page yields an empty list
/// and missing progress yields `Ok(None)`.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::catalog::CatalogProvider;
///
/// async fn first_page(provider: &dyn CatalogProvider) -> CatalogResult<usize> {
///     let items = provider.fetch_page(1, 50, None).await?;
///     Ok(items.len())
/// }
/// ```
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Fetch one page of catalog items.
    ///
    /// `page` is 1-based. `query` filters by title/author text when present.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Transport`] on network failure or a non-2xx
    /// response, [`CatalogError::Decode`] when the page payload is malformed.
    async fn fetch_page(
        &self,
        page: u32,
        limit: u32,
        query: Option<&str>,
    ) -> CatalogResult<Vec<CatalogItem>>;

    /// Fetch the caller's playback progress for one item.
    ///
    /// Returns `Ok(None)` when the server has no progress record (404) or the
    /// record cannot be parsed; both mean "no usable progress", not failure.
    async fn fetch_progress(&self, item_id: &str) -> CatalogResult<Option<ProgressSnapshot>>;
}
