//! # Bookshelf Provider
//!
//! `CatalogProvider` implementation for self-hosted Bookshelf audiobook
//! servers. Speaks the server's JSON API over the platform HTTP bridge:
//! bearer-token auth, paginated item listing with server-side search,
//! per-user playback progress, streamed cover downloads, and retry with
//! exponential backoff for transient failures.

pub mod connector;
pub mod error;
pub mod types;

pub use connector::{BookshelfConfig, BookshelfConnector};
pub use error::{BookshelfError, Result};
