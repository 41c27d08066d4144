//! Error types for sync coordination.

use bridge_traits::catalog::CatalogError;
use core_catalog::MirrorError;
use thiserror::Error;

/// Errors produced by sync operations.
///
/// Most failures never reach callers as this type: remote fetch errors on
/// refresh and background walks are swallowed so the mirror keeps serving
/// its last good state. The variants carry the internal fetch-and-merge
/// plumbing and the one surfaced case, a cold-start read against an
/// unreadable mirror.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Local mirror read or write failed.
    #[error("Mirror error: {0}")]
    Mirror(#[from] MirrorError),

    /// Remote catalog fetch failed.
    #[error("Fetch error: {0}")]
    Fetch(#[from] CatalogError),
}

/// Convenience result alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
