//! Error types for the Bookshelf provider

use bridge_traits::catalog::CatalogError;
use thiserror::Error;

/// Bookshelf provider errors
#[derive(Error, Debug)]
pub enum BookshelfError {
    /// API request returned a terminal, non-retryable error status
    #[error("Bookshelf API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Failed to parse an API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Transport-level failure reported by the platform HTTP bridge
    #[error(transparent)]
    BridgeError(#[from] bridge_traits::error::BridgeError),
}

/// Result type for Bookshelf operations
pub type Result<T> = std::result::Result<T, BookshelfError>;

impl From<BookshelfError> for CatalogError {
    fn from(error: BookshelfError) -> Self {
        match error {
            BookshelfError::ApiError {
                status_code,
                message,
            } => CatalogError::http_status(status_code, message),
            BookshelfError::ParseError(msg) => CatalogError::Decode(msg),
            BookshelfError::BridgeError(e) => CatalogError::transport(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = BookshelfError::ApiError {
            status_code: 401,
            message: "Unauthorized".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Bookshelf API error (status 401): Unauthorized"
        );
    }

    #[test]
    fn test_api_error_keeps_status_in_catalog_error() {
        let error = BookshelfError::ApiError {
            status_code: 403,
            message: "Forbidden".to_string(),
        };
        let catalog_error: CatalogError = error.into();

        assert!(matches!(
            catalog_error,
            CatalogError::Transport {
                status_code: Some(403),
                ..
            }
        ));
    }

    #[test]
    fn test_parse_error_converts_to_decode() {
        let error = BookshelfError::ParseError("unexpected end of input".to_string());
        let catalog_error: CatalogError = error.into();

        assert!(matches!(catalog_error, CatalogError::Decode(_)));
        assert!(catalog_error.to_string().contains("unexpected end of input"));
    }
}
