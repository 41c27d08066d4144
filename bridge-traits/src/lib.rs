//! # Host Bridge Traits
//!
//! Capability contracts between the catalog core and whichever host embeds it.
//!
//! The core crates never touch a socket, a clock, or a platform logger
//! directly. Everything host-specific enters through the traits defined here,
//! so the same sync and caching logic runs unchanged on iOS, Android, and
//! desktop, and runs against hand-written fakes in tests.
//!
//! ## Contracts
//!
//! - [`CatalogProvider`](catalog::CatalogProvider) - remote catalog: one
//!   paged listing call and one per-item progress call
//! - [`HttpClient`](http::HttpClient) - transport for provider
//!   implementations; every delivered status comes back as a response
//! - [`NetworkMonitor`](network::NetworkMonitor) - reachability snapshots
//!   plus a change stream for offline gating
//! - [`Clock`](time::Clock) - injectable time source for cache expiry
//! - [`LoggerSink`](time::LoggerSink) - structured log delivery into the
//!   host's own pipeline
//!
//! ## Errors
//!
//! Host adapters report failures as [`BridgeError`](error::BridgeError).
//! Catalog providers use the narrower [`CatalogError`](catalog::CatalogError)
//! taxonomy, which separates transport faults from decode faults and keeps
//! "not found" out of the error path entirely.
//!
//! Every trait here is object-safe and bounded `Send + Sync` (streams are
//! `Send`), so adapters cross task boundaries freely and carry their own
//! synchronization.

pub mod catalog;
pub mod error;
pub mod http;
pub mod network;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use catalog::{CatalogError, CatalogItem, CatalogProvider, CatalogResult, ProgressSnapshot};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use network::{NetworkChangeStream, NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
