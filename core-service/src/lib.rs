//! # Library Service Facade
//!
//! Composition root for the audiobook library core. Builds the full stack
//! out of one [`CoreConfig`]: mirror database pool, repository, sync
//! coordinator, listening-status cache, and invalidation bus, plus the
//! background listener tasks that keep them connected. Host applications
//! construct a [`LibraryService`] once and drive everything through it.
//!
//! ```ignore
//! use core_service::{CoreConfig, LibraryService, PageFingerprint, SortMode};
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/data/library.db")
//!     .catalog_provider(Arc::new(connector))
//!     .build()?;
//! let service = LibraryService::new(config).await?;
//!
//! let fingerprint = PageFingerprint::first_page(50, None);
//! let items = service.initial_load(&fingerprint, SortMode::Added).await?;
//! ```

pub mod error;

pub use error::{CoreError, Result};

pub use bridge_traits::catalog::{CatalogItem, CatalogProvider, ProgressSnapshot};
pub use core_catalog::SortMode;
pub use core_progress::ItemStatus;
pub use core_runtime::config::{CoreConfig, CoreConfigBuilder, FeatureFlags, StatusCacheConfig};
pub use core_runtime::events::{
    ConnectivityEvent, CoreEvent, EventStream, LibraryEvent, SyncEvent,
};
pub use core_sync::PageFingerprint;

#[cfg(feature = "native-shims")]
pub use provider_bookshelf::{BookshelfConfig, BookshelfConnector};

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use bridge_traits::network::NetworkMonitor;
use core_catalog::{create_pool, DatabaseConfig, LibraryItemRepository, SqliteLibraryItemRepository};
use core_progress::{
    spawn_invalidation_listener, InvalidationBus, StatusCache, DEFAULT_INVALIDATION_BUFFER_SIZE,
};
use core_runtime::logging::strip_path;
use core_runtime::EventBus;
use core_sync::{SyncConfig, SyncCoordinator};

/// Primary facade exposed to host applications.
///
/// Owns the wired component stack and the background tasks (invalidation
/// listener, connectivity watcher). Dropping the service aborts those tasks;
/// in-flight reads and resolves complete normally.
pub struct LibraryService {
    coordinator: SyncCoordinator,
    status_cache: Arc<StatusCache>,
    invalidation_bus: InvalidationBus,
    event_bus: EventBus,
    tasks: Vec<JoinHandle<()>>,
}

impl LibraryService {
    /// Wires the full component stack from `config`.
    ///
    /// Opens the mirror database (running migrations), builds the sync
    /// coordinator and status cache over the injected bridges, and spawns
    /// the invalidation listener plus, when enabled, the connectivity
    /// watcher.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Runtime`] for an invalid configuration and
    /// [`CoreError::Mirror`] when the database cannot be opened or migrated.
    pub async fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let CoreConfig {
            database_path,
            catalog_provider,
            network_monitor,
            clock,
            features,
            status_cache,
            event_buffer_size,
        } = config;

        debug!(
            database = %strip_path(&database_path.to_string_lossy()),
            "Opening catalog mirror"
        );
        let db_config = if database_path.as_os_str() == ":memory:" {
            DatabaseConfig::in_memory()
        } else {
            DatabaseConfig::new(database_path)
        };
        let pool = create_pool(db_config).await?;
        let mirror: Arc<dyn LibraryItemRepository> =
            Arc::new(SqliteLibraryItemRepository::new(pool));

        let event_bus = EventBus::new(event_buffer_size);

        let coordinator = SyncCoordinator::new(
            Arc::clone(&catalog_provider),
            mirror,
            Arc::clone(&network_monitor),
            event_bus.clone(),
            SyncConfig {
                background_sync: features.enable_background_sync,
                ..SyncConfig::default()
            },
        );

        let status_cache = Arc::new(StatusCache::new(catalog_provider, clock, status_cache));

        let invalidation_bus = InvalidationBus::new(DEFAULT_INVALIDATION_BUFFER_SIZE);
        let mut tasks = vec![spawn_invalidation_listener(
            &invalidation_bus,
            Arc::clone(&status_cache),
            event_bus.clone(),
        )];
        if features.enable_connectivity_events {
            tasks.push(spawn_connectivity_watcher(
                network_monitor,
                event_bus.clone(),
            ));
        }

        info!(
            background_sync = features.enable_background_sync,
            connectivity_events = features.enable_connectivity_events,
            "Library service initialized"
        );

        Ok(Self {
            coordinator,
            status_cache,
            invalidation_bus,
            event_bus,
            tasks,
        })
    }

    /// Cold-start read: refresh the first page if possible, then serve it
    /// from the mirror. The single surfaced failure is an unreadable mirror.
    pub async fn initial_load(
        &self,
        fingerprint: &PageFingerprint,
        sort: SortMode,
    ) -> Result<Vec<CatalogItem>> {
        let items = self.coordinator.initial_load(fingerprint, sort).await?;
        Ok(items)
    }

    /// Reads the fingerprint's page from the local mirror, never the network.
    pub async fn read_page(
        &self,
        fingerprint: &PageFingerprint,
        sort: SortMode,
    ) -> Result<Vec<CatalogItem>> {
        let items = self.coordinator.read_page(fingerprint, sort).await?;
        Ok(items)
    }

    /// Refreshes the first page from the server and merges it into the
    /// mirror. Failures are swallowed into events; offline is a no-op.
    pub async fn refresh_first_page(&self, fingerprint: &PageFingerprint) {
        self.coordinator.refresh_first_page(fingerprint).await;
    }

    /// Walks the remaining pages of the fingerprint's stream into the mirror.
    pub async fn background_full_sync(&self, fingerprint: &PageFingerprint) {
        self.coordinator.background_full_sync(fingerprint).await;
    }

    /// Advances the browsing sequence one page and returns it.
    pub async fn load_more(
        &self,
        fingerprint: &PageFingerprint,
        sort: SortMode,
    ) -> Result<Vec<CatalogItem>> {
        let items = self.coordinator.load_more(fingerprint, sort).await?;
        Ok(items)
    }

    /// Drops the current browsing sequence and starts over for `fingerprint`.
    pub async fn restart(&self, fingerprint: &PageFingerprint) {
        self.coordinator.restart(fingerprint).await;
    }

    /// Resolves the listening status for one item. Total: failures resolve
    /// to the best derivable status instead of erroring.
    pub async fn resolve(&self, item_id: &str, hint: &CatalogItem) -> ItemStatus {
        self.status_cache.resolve(item_id, hint).await
    }

    /// Publishes a progress invalidation for these items.
    ///
    /// The cache listener drops their entries asynchronously; the next
    /// `resolve` after delivery re-fetches. Returns the number of
    /// subscribers the invalidation reached.
    pub fn invalidate(&self, item_ids: Vec<String>) -> usize {
        self.invalidation_bus.publish(item_ids)
    }

    /// Subscribes to sync, library, and connectivity events.
    pub fn subscribe_events(&self) -> EventStream {
        self.event_bus.subscribe()
    }
}

impl Drop for LibraryService {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Forwards connectivity transitions from the monitor stream to the event
/// bus, one event per online/offline change.
fn spawn_connectivity_watcher(
    monitor: Arc<dyn NetworkMonitor>,
    events: EventBus,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stream = match monitor.subscribe_changes().await {
            Ok(stream) => stream,
            Err(error) => {
                warn!(error = %error, "Connectivity change stream unavailable");
                return;
            }
        };

        // Seeding with the current state keeps a redundant startup
        // notification from looking like a transition.
        let mut online = monitor.is_connected().await;
        while let Some(info) = stream.next().await {
            let now_online = info.is_online();
            if now_online == online {
                continue;
            }
            online = now_online;
            let event = if now_online {
                ConnectivityEvent::Online
            } else {
                ConnectivityEvent::Offline
            };
            debug!(online = now_online, "Connectivity transition observed");
            events.emit(CoreEvent::Connectivity(event));
        }
        debug!("Connectivity change stream ended");
    })
}
