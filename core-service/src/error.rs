use thiserror::Error;

/// Errors surfaced by the library service facade.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Mirror error: {0}")]
    Mirror(#[from] core_catalog::MirrorError),

    #[error("Sync error: {0}")]
    Sync(#[from] core_sync::SyncError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
