//! End-to-end tests for the library service facade
//!
//! These tests wire a full service over an in-memory SQLite mirror and a
//! scripted catalog server, covering:
//! - Cold-start load through the facade and mirror-backed ordering
//! - Offline reads and the once-per-transition offline event
//! - Background full-sync completion observed through the event stream
//! - Load-more paging through the facade
//! - Status resolution: coalescing, and invalidation round trips
//! - Connectivity watcher forwarding and deduplication
//! - Invalid configuration rejection

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use tokio::sync::mpsc;

use bridge_traits::catalog::{CatalogItem, CatalogProvider, CatalogResult, ProgressSnapshot};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::network::{
    NetworkChangeStream, NetworkInfo, NetworkMonitor, NetworkStatus,
};
use bridge_traits::time::SystemClock;
use core_service::{
    ConnectivityEvent, CoreConfig, CoreError, CoreEvent, EventStream, FeatureFlags, ItemStatus,
    LibraryEvent, LibraryService, PageFingerprint, SortMode, StatusCacheConfig, SyncEvent,
};

// ============================================================================
// Mock Implementations
// ============================================================================

/// Scripted catalog server holding a fixed item list and a progress map.
struct FakeCatalogServer {
    items: Vec<CatalogItem>,
    progress: Mutex<HashMap<String, ProgressSnapshot>>,
    progress_delay: Option<Duration>,
    page_calls: Mutex<Vec<u32>>,
    progress_calls: Mutex<Vec<String>>,
}

impl FakeCatalogServer {
    fn new(items: Vec<CatalogItem>) -> Self {
        Self {
            items,
            progress: Mutex::new(HashMap::new()),
            progress_delay: None,
            page_calls: Mutex::new(Vec::new()),
            progress_calls: Mutex::new(Vec::new()),
        }
    }

    fn with_progress_delay(mut self, delay: Duration) -> Self {
        self.progress_delay = Some(delay);
        self
    }

    fn set_progress(&self, item_id: &str, snapshot: ProgressSnapshot) {
        self.progress
            .lock()
            .unwrap()
            .insert(item_id.to_string(), snapshot);
    }

    fn pages_requested(&self) -> Vec<u32> {
        self.page_calls.lock().unwrap().clone()
    }

    fn progress_fetches(&self) -> usize {
        self.progress_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CatalogProvider for FakeCatalogServer {
    async fn fetch_page(
        &self,
        page: u32,
        limit: u32,
        _query: Option<&str>,
    ) -> CatalogResult<Vec<CatalogItem>> {
        self.page_calls.lock().unwrap().push(page);
        let start = ((page - 1) * limit) as usize;
        Ok(self
            .items
            .iter()
            .skip(start)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn fetch_progress(&self, item_id: &str) -> CatalogResult<Option<ProgressSnapshot>> {
        self.progress_calls.lock().unwrap().push(item_id.to_string());
        if let Some(delay) = self.progress_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.progress.lock().unwrap().get(item_id).cloned())
    }
}

/// Connectivity monitor with a switchable online flag and no change stream.
struct FakeNetwork {
    online: AtomicBool,
}

impl FakeNetwork {
    fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn info(online: bool) -> NetworkInfo {
        NetworkInfo {
            status: if online {
                NetworkStatus::Connected
            } else {
                NetworkStatus::Disconnected
            },
            network_type: None,
            is_metered: false,
            is_expensive: false,
        }
    }
}

#[async_trait]
impl NetworkMonitor for FakeNetwork {
    async fn get_network_info(&self) -> BridgeResult<NetworkInfo> {
        Ok(FakeNetwork::info(self.online.load(Ordering::SeqCst)))
    }

    async fn subscribe_changes(&self) -> BridgeResult<Box<dyn NetworkChangeStream>> {
        Err(BridgeError::NotAvailable(
            "no change stream in tests".to_string(),
        ))
    }
}

/// Connectivity monitor whose transitions are pushed by the test.
///
/// Polled state is pinned to connected; transitions travel only through the
/// pushed stream, so the watcher's seed never races a push.
struct PushMonitor {
    sender: mpsc::UnboundedSender<NetworkInfo>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<NetworkInfo>>>,
}

impl PushMonitor {
    fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(Some(receiver)),
        }
    }

    fn push(&self, online: bool) {
        self.sender.send(FakeNetwork::info(online)).unwrap();
    }
}

#[async_trait]
impl NetworkMonitor for PushMonitor {
    async fn get_network_info(&self) -> BridgeResult<NetworkInfo> {
        Ok(FakeNetwork::info(true))
    }

    async fn subscribe_changes(&self) -> BridgeResult<Box<dyn NetworkChangeStream>> {
        let receiver = self
            .receiver
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| BridgeError::NotAvailable("stream already taken".to_string()))?;
        Ok(Box::new(ChannelChangeStream { receiver }))
    }
}

struct ChannelChangeStream {
    receiver: mpsc::UnboundedReceiver<NetworkInfo>,
}

#[async_trait]
impl NetworkChangeStream for ChannelChangeStream {
    async fn next(&mut self) -> Option<NetworkInfo> {
        self.receiver.recv().await
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn item(id: &str, title: &str) -> CatalogItem {
    let mut item = CatalogItem::new(id, title);
    item.duration_ms = Some(3_600_000);
    item
}

fn item_updated(id: &str, title: &str, millis: i64) -> CatalogItem {
    let mut item = item(id, title);
    item.updated_at = DateTime::from_timestamp_millis(millis);
    item
}

/// `count` items titled "Book 1".. in an order where name sort is stable.
fn shelf(count: usize) -> Vec<CatalogItem> {
    (1..=count)
        .map(|i| item(&format!("li_{i}"), &format!("Book {i}")))
        .collect()
}

async fn setup(
    server: FakeCatalogServer,
    background_sync: bool,
) -> (LibraryService, Arc<FakeCatalogServer>, Arc<FakeNetwork>) {
    let server = Arc::new(server);
    let network = Arc::new(FakeNetwork::new(true));
    let config = CoreConfig::builder()
        .database_path(":memory:")
        .catalog_provider(server.clone())
        .network_monitor(network.clone())
        .enable_background_sync(background_sync)
        .enable_connectivity_events(false)
        .build()
        .unwrap();
    let service = LibraryService::new(config).await.unwrap();
    (service, server, network)
}

async fn next_event(stream: &mut EventStream) -> CoreEvent {
    tokio::time::timeout(Duration::from_secs(2), stream.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event bus closed")
}

// ============================================================================
// Cold start and offline reads
// ============================================================================

#[tokio::test]
async fn test_initial_load_fills_mirror_and_serves_sorted_page() {
    let server = FakeCatalogServer::new(vec![
        item_updated("li_1", "Annihilation", 1_000),
        item_updated("li_2", "Borne", 3_000),
        item_updated("li_3", "Dune", 2_000),
    ]);
    let (service, server, _network) = setup(server, false).await;

    let fingerprint = PageFingerprint::first_page(50, None);
    let items = service
        .initial_load(&fingerprint, SortMode::Added)
        .await
        .unwrap();

    // Most recently updated first: the mirror's order, not the server's.
    let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["Borne", "Dune", "Annihilation"]);
    assert_eq!(server.pages_requested(), vec![1]);
}

#[tokio::test]
async fn test_offline_reads_serve_the_mirror() {
    let (service, server, network) = setup(FakeCatalogServer::new(shelf(3)), false).await;

    let fingerprint = PageFingerprint::first_page(50, None);
    service
        .initial_load(&fingerprint, SortMode::Name)
        .await
        .unwrap();

    network.set_online(false);
    let mut connectivity = service
        .subscribe_events()
        .filter(|event| matches!(event, CoreEvent::Connectivity(_)));

    // The refresh is a no-op offline, apart from one transition event.
    service.refresh_first_page(&fingerprint).await;
    assert_eq!(
        next_event(&mut connectivity).await,
        CoreEvent::Connectivity(ConnectivityEvent::Offline)
    );

    service.refresh_first_page(&fingerprint).await;
    assert_eq!(connectivity.try_recv(), None);

    let items = service.read_page(&fingerprint, SortMode::Name).await.unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(server.pages_requested(), vec![1]);
}

// ============================================================================
// Background walk and load-more
// ============================================================================

#[tokio::test]
async fn test_background_walk_completes_through_the_facade() {
    let (service, server, _network) = setup(FakeCatalogServer::new(shelf(5)), true).await;

    let mut completed = service
        .subscribe_events()
        .filter(|event| matches!(event, CoreEvent::Sync(SyncEvent::Completed { .. })));

    let fingerprint = PageFingerprint::first_page(2, None);
    let first = service
        .initial_load(&fingerprint, SortMode::Name)
        .await
        .unwrap();
    assert_eq!(first.len(), 2);

    // The refresh covered page 1; the spawned walk owns the rest.
    match next_event(&mut completed).await {
        CoreEvent::Sync(SyncEvent::Completed {
            pages, total_items, ..
        }) => {
            assert_eq!(pages, 2);
            assert_eq!(total_items, 3);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(server.pages_requested(), vec![1, 2, 3]);

    let last_page = service
        .read_page(&PageFingerprint::new(3, 2, None), SortMode::Name)
        .await
        .unwrap();
    assert_eq!(last_page.len(), 1);
    assert_eq!(last_page[0].title, "Book 5");
}

#[tokio::test]
async fn test_load_more_pages_through_the_mirror() {
    let (service, server, _network) = setup(FakeCatalogServer::new(shelf(5)), false).await;

    let fingerprint = PageFingerprint::first_page(2, None);
    let first = service
        .initial_load(&fingerprint, SortMode::Name)
        .await
        .unwrap();
    let second = service.load_more(&fingerprint, SortMode::Name).await.unwrap();
    let third = service.load_more(&fingerprint, SortMode::Name).await.unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);
    assert_eq!(third.len(), 1);
    assert_eq!(second[0].title, "Book 3");
    assert_eq!(third[0].title, "Book 5");
    assert_eq!(server.pages_requested(), vec![1, 2, 3]);
}

// ============================================================================
// Listening status
// ============================================================================

#[tokio::test]
async fn test_resolve_coalesces_concurrent_callers() {
    let server = FakeCatalogServer::new(shelf(1)).with_progress_delay(Duration::from_millis(25));
    server.set_progress(
        "li_1",
        ProgressSnapshot {
            progress_ratio: Some(0.5),
            ..ProgressSnapshot::default()
        },
    );
    let (service, server, _network) = setup(server, false).await;

    let hint = item("li_1", "Book 1");
    let (a, b, c) = tokio::join!(
        service.resolve("li_1", &hint),
        service.resolve("li_1", &hint),
        service.resolve("li_1", &hint),
    );

    assert_eq!(a, ItemStatus::InProgress);
    assert_eq!(b, ItemStatus::InProgress);
    assert_eq!(c, ItemStatus::InProgress);
    assert_eq!(server.progress_fetches(), 1);
}

#[tokio::test]
async fn test_invalidate_round_trips_to_a_fresh_status() {
    let server = FakeCatalogServer::new(shelf(1));
    server.set_progress(
        "li_1",
        ProgressSnapshot {
            progress_ratio: Some(0.5),
            ..ProgressSnapshot::default()
        },
    );
    let (service, server, _network) = setup(server, false).await;

    let hint = item("li_1", "Book 1");
    assert_eq!(service.resolve("li_1", &hint).await, ItemStatus::InProgress);
    assert_eq!(server.progress_fetches(), 1);

    server.set_progress(
        "li_1",
        ProgressSnapshot {
            is_finished: true,
            ..ProgressSnapshot::default()
        },
    );

    let mut invalidations = service
        .subscribe_events()
        .filter(|event| matches!(event, CoreEvent::Library(LibraryEvent::ProgressInvalidated { .. })));
    let delivered = service.invalidate(vec!["li_1".to_string()]);
    assert_eq!(delivered, 1);

    // The listener applies the invalidation before emitting this event.
    assert_eq!(
        next_event(&mut invalidations).await,
        CoreEvent::Library(LibraryEvent::ProgressInvalidated {
            item_ids: vec!["li_1".to_string()]
        })
    );

    assert_eq!(service.resolve("li_1", &hint).await, ItemStatus::Completed);
    assert_eq!(server.progress_fetches(), 2);
}

// ============================================================================
// Connectivity watcher
// ============================================================================

#[tokio::test]
async fn test_connectivity_transitions_reach_subscribers() {
    let server = Arc::new(FakeCatalogServer::new(shelf(1)));
    let monitor = Arc::new(PushMonitor::new());
    let config = CoreConfig::builder()
        .database_path(":memory:")
        .catalog_provider(server)
        .network_monitor(monitor.clone())
        .enable_background_sync(false)
        .build()
        .unwrap();
    let service = LibraryService::new(config).await.unwrap();

    let mut connectivity = service
        .subscribe_events()
        .filter(|event| matches!(event, CoreEvent::Connectivity(_)));

    monitor.push(false);
    assert_eq!(
        next_event(&mut connectivity).await,
        CoreEvent::Connectivity(ConnectivityEvent::Offline)
    );

    // A repeated offline report is not a transition; the next event through
    // must be the recovery.
    monitor.push(false);
    monitor.push(true);
    assert_eq!(
        next_event(&mut connectivity).await,
        CoreEvent::Connectivity(ConnectivityEvent::Online)
    );
}

// ============================================================================
// Configuration errors
// ============================================================================

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let config = CoreConfig {
        database_path: PathBuf::from(":memory:"),
        catalog_provider: Arc::new(FakeCatalogServer::new(Vec::new())),
        network_monitor: Arc::new(FakeNetwork::new(true)),
        clock: Arc::new(SystemClock),
        features: FeatureFlags::default(),
        status_cache: StatusCacheConfig::new(),
        event_buffer_size: 0,
    };

    let error = match LibraryService::new(config).await {
        Ok(_) => panic!("a zero event buffer must be rejected"),
        Err(error) => error,
    };
    assert!(matches!(error, CoreError::Runtime(_)));
    assert!(error.to_string().contains("Event buffer size"));
}
