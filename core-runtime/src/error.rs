//! Error types for core runtime configuration and initialization.

use thiserror::Error;

/// Errors produced while configuring or initializing the core.
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required host capability was not injected.
    ///
    /// The message explains which implementations satisfy the capability on
    /// each platform.
    #[error("Missing capability '{capability}': {message}")]
    CapabilityMissing { capability: String, message: String },

    /// An unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience result alias for runtime initialization.
pub type Result<T> = std::result::Result<T, Error>;
