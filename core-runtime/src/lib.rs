//! # Core Runtime
//!
//! Shared runtime infrastructure for the audiobook platform core:
//!
//! - [`config`] - Dependency injection and validation for host bridges
//! - [`events`] - Broadcast bus carrying core state changes to the host
//! - [`logging`] - `tracing` setup with optional host sink forwarding
//! - [`error`] - Initialization error types
//!
//! Domain crates (`core-catalog`, `core-sync`, `core-progress`) build on the
//! primitives here; hosts interact with them through `core-service`.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder, FeatureFlags, StatusCacheConfig};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream};
