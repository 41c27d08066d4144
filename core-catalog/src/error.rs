//! Failure modes of the local mirror.

use thiserror::Error;

/// What can go wrong between a caller and the mirror database.
///
/// `Database` wraps sqlx faults verbatim. `InvalidInput` rejects arguments
/// before any query runs, so a bad page number never reaches SQLite.
#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("Mirror query failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Mirror schema migration failed: {0}")]
    Migration(String),

    #[error("Rejected {field}: {message}")]
    InvalidInput { field: String, message: String },
}

pub type Result<T> = std::result::Result<T, MirrorError>;
