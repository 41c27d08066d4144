//! # Core Configuration Module
//!
//! Configuration management for the audiobook platform core.
//!
//! ## Overview
//!
//! A [`CoreConfig`] carries the injected host bridges and tuning knobs the
//! core needs, and is assembled through [`CoreConfigBuilder`]. Validation is
//! fail-fast: a missing required bridge is reported at build time with an
//! actionable message, not at first use.
//!
//! ## Required Dependencies
//!
//! - `CatalogProvider` - Remote library server access (catalog pages,
//!   playback progress)
//! - `NetworkMonitor` - Connectivity detection (native default available via
//!   the `native-shims` feature)
//!
//! ## Optional Dependencies (with defaults)
//!
//! - `Clock` - Time source; defaults to the system clock. Tests inject a
//!   manual clock to drive cache expiry deterministically.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/data/library.db")
//!     .catalog_provider(Arc::new(MyServerConnector::new(server_config)))
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ## Error Handling
//!
//! The builder reports exactly which capability is missing and how to
//! satisfy it:
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // Panics: no CatalogProvider was injected.
//! let config = CoreConfig::builder()
//!     .database_path("/data/library.db")
//!     .build()
//!     .expect("Should fail - missing required bridges");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::catalog::CatalogProvider;
use bridge_traits::network::NetworkMonitor;
use bridge_traits::time::{Clock, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Core configuration for the audiobook platform core.
///
/// Holds all injected bridges and settings needed to initialize the library
/// service. Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Path to the SQLite file backing the local catalog mirror
    pub database_path: PathBuf,

    /// Remote library server access (required)
    pub catalog_provider: Arc<dyn CatalogProvider>,

    /// Connectivity monitor (required; native default via `native-shims`)
    pub network_monitor: Arc<dyn NetworkMonitor>,

    /// Time source (defaults to the system clock)
    pub clock: Arc<dyn Clock>,

    /// Feature flags
    pub features: FeatureFlags,

    /// Listening-status cache tuning
    pub status_cache: StatusCacheConfig,

    /// Buffer size for the core event broadcast channel
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field("catalog_provider", &"CatalogProvider { ... }")
            .field("network_monitor", &"NetworkMonitor { ... }")
            .field("clock", &"Clock { ... }")
            .field("features", &self.features)
            .field("status_cache", &self.status_cache)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

/// Feature flags control optional core behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Walk the full remote collection in the background after each
    /// first-page refresh. Disabling leaves only explicit sync calls.
    pub enable_background_sync: bool,

    /// Forward connectivity transitions to the host event stream.
    pub enable_connectivity_events: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_background_sync: true,
            enable_connectivity_events: true,
        }
    }
}

/// Tuning for the per-item listening-status cache.
///
/// # Example
///
/// ```
/// use core_runtime::config::StatusCacheConfig;
/// use std::time::Duration;
///
/// let config = StatusCacheConfig::new().with_ttl(Duration::from_secs(120));
/// assert_eq!(config.ttl, Duration::from_secs(120));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCacheConfig {
    /// How long a resolved status stays fresh before the next access
    /// re-fetches progress from the server.
    pub ttl: Duration,
}

/// Default freshness window for cached listening statuses.
pub const DEFAULT_STATUS_TTL: Duration = Duration::from_secs(5 * 60);

impl StatusCacheConfig {
    /// Creates a config with the default five-minute freshness window.
    pub fn new() -> Self {
        Self {
            ttl: DEFAULT_STATUS_TTL,
        }
    }

    /// Sets the freshness window.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.ttl.is_zero() {
            return Err(Error::Config(
                "Status cache TTL must be greater than zero".to_string(),
            ));
        }

        if self.ttl > Duration::from_secs(60 * 60) {
            return Err(Error::Config(
                "Status cache TTL exceeds maximum of 1 hour".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for StatusCacheConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CoreConfig {
    /// Starts an empty builder.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Checks the invariants every running service relies on: a non-empty
    /// mirror path, a usable event buffer, sane cache tuning.
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path must not be empty".to_string()));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than zero".to_string(),
            ));
        }

        if self.event_buffer_size > 10_000 {
            return Err(Error::Config(
                "Event buffer size exceeds maximum of 10,000 events".to_string(),
            ));
        }

        self.status_cache.validate()?;

        Ok(())
    }
}

fn catalog_provider_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "CatalogProvider".to_string(),
        message: "a CatalogProvider implementation is required for server access. \
                 Inject a server connector (e.g. the Bookshelf provider) via \
                 .catalog_provider(), or a scripted provider in tests."
            .to_string(),
    }
}

#[cfg(feature = "native-shims")]
fn provide_default_network_monitor() -> Result<Arc<dyn NetworkMonitor>> {
    use bridge_native::NativeNetworkMonitor;

    let monitor: Arc<dyn NetworkMonitor> = Arc::new(NativeNetworkMonitor::new());
    Ok(monitor)
}

#[cfg(not(feature = "native-shims"))]
fn provide_default_network_monitor() -> Result<Arc<dyn NetworkMonitor>> {
    Err(Error::CapabilityMissing {
        capability: "NetworkMonitor".to_string(),
        message: "a NetworkMonitor implementation is required for offline handling. \
                 Native: enable the 'native-shims' feature to use the default probe-based monitor. \
                 Mobile: inject the platform connectivity bridge (NWPathMonitor/ConnectivityManager)."
            .to_string(),
    })
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Set options incrementally and call [`build()`](CoreConfigBuilder::build)
/// to validate and produce the final config.
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    catalog_provider: Option<Arc<dyn CatalogProvider>>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    clock: Option<Arc<dyn Clock>>,
    features: FeatureFlags,
    status_cache: Option<StatusCacheConfig>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the mirror database path.
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder().database_path("/data/library.db");
    /// ```
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the remote catalog provider (required).
    pub fn catalog_provider(mut self, provider: Arc<dyn CatalogProvider>) -> Self {
        self.catalog_provider = Some(provider);
        self
    }

    /// Sets the network monitor implementation.
    ///
    /// If not provided, the native probe-based default is used when the
    /// `native-shims` feature is enabled.
    pub fn network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    /// Sets the time source.
    ///
    /// Defaults to the system clock. Tests inject a manual clock to control
    /// cache expiry.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Enables or disables the background full-collection sync.
    ///
    /// Default: enabled
    pub fn enable_background_sync(mut self, enabled: bool) -> Self {
        self.features.enable_background_sync = enabled;
        self
    }

    /// Enables or disables connectivity events on the host event stream.
    ///
    /// Default: enabled
    pub fn enable_connectivity_events(mut self, enabled: bool) -> Self {
        self.features.enable_connectivity_events = enabled;
        self
    }

    /// Replaces the whole feature-flag set.
    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Sets the listening-status cache tuning.
    pub fn status_cache(mut self, config: StatusCacheConfig) -> Self {
        self.status_cache = Some(config);
        self
    }

    /// Sets the event broadcast buffer size.
    ///
    /// Default: [`DEFAULT_EVENT_BUFFER_SIZE`]
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Resolves defaults, validates, and produces the config.
    ///
    /// Fails when a required bridge was never injected or a value is out of
    /// range, with a message naming the missing capability.
    pub fn build(self) -> Result<CoreConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config(
                "No database path set. Call .database_path() with the mirror location."
                    .to_string(),
            )
        })?;

        let catalog_provider = self
            .catalog_provider
            .ok_or_else(catalog_provider_missing_error)?;

        let network_monitor = match self.network_monitor {
            Some(monitor) => monitor,
            None => provide_default_network_monitor()?,
        };

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);

        let config = CoreConfig {
            database_path,
            catalog_provider,
            network_monitor,
            clock,
            features: self.features,
            status_cache: self.status_cache.unwrap_or_default(),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::catalog::{CatalogItem, CatalogResult, ProgressSnapshot};
    use bridge_traits::error::BridgeError;
    use bridge_traits::network::{NetworkChangeStream, NetworkInfo, NetworkStatus};
    use std::sync::Arc;

    struct MockCatalogProvider;

    #[async_trait]
    impl CatalogProvider for MockCatalogProvider {
        async fn fetch_page(
            &self,
            _page: u32,
            _limit: u32,
            _query: Option<&str>,
        ) -> CatalogResult<Vec<CatalogItem>> {
            Ok(Vec::new())
        }

        async fn fetch_progress(
            &self,
            _item_id: &str,
        ) -> CatalogResult<Option<ProgressSnapshot>> {
            Ok(None)
        }
    }

    struct MockNetworkMonitor;

    #[async_trait]
    impl NetworkMonitor for MockNetworkMonitor {
        async fn get_network_info(&self) -> bridge_traits::error::Result<NetworkInfo> {
            Ok(NetworkInfo {
                status: NetworkStatus::Connected,
                network_type: None,
                is_metered: false,
                is_expensive: false,
            })
        }

        async fn subscribe_changes(
            &self,
        ) -> bridge_traits::error::Result<Box<dyn NetworkChangeStream>> {
            Err(BridgeError::NotAvailable("mock monitor".to_string()))
        }
    }

    fn builder_with_bridges() -> CoreConfigBuilder {
        CoreConfig::builder()
            .database_path("/data/library.db")
            .catalog_provider(Arc::new(MockCatalogProvider))
            .network_monitor(Arc::new(MockNetworkMonitor))
    }

    #[test]
    fn test_build_fails_without_database_path() {
        let result = CoreConfig::builder()
            .catalog_provider(Arc::new(MockCatalogProvider))
            .network_monitor(Arc::new(MockNetworkMonitor))
            .build();

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("No database path set"));
    }

    #[test]
    fn test_build_fails_without_catalog_provider() {
        let result = CoreConfig::builder()
            .database_path("/data/library.db")
            .network_monitor(Arc::new(MockNetworkMonitor))
            .build();

        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("CatalogProvider"));
        assert!(err_msg.contains("server"));
    }

    #[cfg(not(feature = "native-shims"))]
    #[test]
    fn test_builder_requires_network_monitor_without_shims() {
        let result = CoreConfig::builder()
            .database_path("/data/library.db")
            .catalog_provider(Arc::new(MockCatalogProvider))
            .build();

        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("NetworkMonitor"));
        assert!(err_msg.contains("native-shims"));
    }

    #[cfg(feature = "native-shims")]
    #[test]
    fn test_builder_uses_native_monitor_by_default() {
        let result = CoreConfig::builder()
            .database_path("/data/library.db")
            .catalog_provider(Arc::new(MockCatalogProvider))
            .build();

        assert!(result.is_ok());
    }

    #[test]
    fn test_build_applies_defaults() {
        let config = builder_with_bridges().build().unwrap();

        assert_eq!(config.database_path, PathBuf::from("/data/library.db"));
        assert_eq!(config.status_cache.ttl, DEFAULT_STATUS_TTL);
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert!(config.features.enable_background_sync);
        assert!(config.features.enable_connectivity_events);
    }

    #[test]
    fn test_builder_with_custom_status_ttl() {
        let config = builder_with_bridges()
            .status_cache(StatusCacheConfig::new().with_ttl(Duration::from_secs(30)))
            .build()
            .unwrap();

        assert_eq!(config.status_cache.ttl, Duration::from_secs(30));
    }

    #[test]
    fn test_validate_rejects_zero_ttl() {
        let result = builder_with_bridges()
            .status_cache(StatusCacheConfig::new().with_ttl(Duration::ZERO))
            .build();

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("greater than zero"));
    }

    #[test]
    fn test_validate_rejects_excessive_ttl() {
        let result = builder_with_bridges()
            .status_cache(StatusCacheConfig::new().with_ttl(Duration::from_secs(2 * 60 * 60)))
            .build();

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_validate_rejects_zero_event_buffer() {
        let result = builder_with_bridges().event_buffer_size(0).build();

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Event buffer size"));
    }

    #[test]
    fn test_flags_default_enabled() {
        let flags = FeatureFlags::default();
        assert!(flags.enable_background_sync);
        assert!(flags.enable_connectivity_events);
    }

    #[test]
    fn test_builder_disables_background_sync() {
        let config = builder_with_bridges()
            .enable_background_sync(false)
            .build()
            .unwrap();

        assert!(!config.features.enable_background_sync);
        assert!(config.features.enable_connectivity_events);
    }

    #[test]
    fn test_builder_takes_owned_pathbuf() {
        let config = CoreConfig::builder()
            .database_path(PathBuf::from("/data/library.db"))
            .catalog_provider(Arc::new(MockCatalogProvider))
            .network_monitor(Arc::new(MockNetworkMonitor))
            .build()
            .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/data/library.db"));
    }

    #[test]
    fn test_clone_preserves_settings() {
        let config = builder_with_bridges().build().unwrap();
        let cloned = config.clone();

        assert_eq!(cloned.database_path, config.database_path);
        assert_eq!(cloned.event_buffer_size, config.event_buffer_size);
    }

    #[test]
    fn test_debug_redacts_bridge_internals() {
        let config = builder_with_bridges().build().unwrap();
        let debug = format!("{config:?}");

        assert!(debug.contains("CatalogProvider { ... }"));
        assert!(debug.contains("/data/library.db"));
    }
}
