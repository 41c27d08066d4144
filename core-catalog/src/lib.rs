//! # Core Catalog
//!
//! Local SQLite mirror of the remote library catalog.
//!
//! The mirror is the single read path for catalog listings: the UI always
//! reads pages from here, while sync merges server pages in behind it. Rows
//! survive offline periods and server deletions; the mirror only grows or
//! updates.
//!
//! - [`db`] - Connection pool creation and migrations
//! - [`models`] - Row mapping and sort modes
//! - [`repository`] - [`LibraryItemRepository`] data access trait

pub mod db;
pub mod error;
pub mod models;
pub mod repository;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{MirrorError, Result};
pub use models::SortMode;
pub use repository::{LibraryItemRepository, SqliteLibraryItemRepository};
