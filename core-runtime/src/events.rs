//! # Core Event System
//!
//! Broadcast channel for pushing core state changes out to host platforms.
//!
//! ## Architecture
//!
//! ```text
//!  ┌────────────────┐    emit     ┌─────────────┐  subscribe  ┌───────────────┐
//!  │ Sync engine /  │ ──────────► │  EventBus   │ ──────────► │ Host adapters │
//!  │ Library layer /│             │ (broadcast) │             │ (UI, logging, │
//!  │ Connectivity   │             └─────────────┘             │  diagnostics) │
//!  └────────────────┘                                         └───────────────┘
//! ```
//!
//! Events are fan-out: every active [`EventStream`] receives every event. A
//! subscriber that falls more than the buffer size behind loses the oldest
//! events and resumes from the newest available one.
//!
//! ## Usage
//!
//! ```
//! use core_runtime::events::{CoreEvent, ConnectivityEvent, EventBus};
//!
//! let bus = EventBus::new(16);
//! // No subscribers yet, so nothing is delivered.
//! let delivered = bus.emit(CoreEvent::Connectivity(ConnectivityEvent::Online));
//! assert_eq!(delivered, 0);
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default buffer size for the event broadcast channel.
///
/// Subscribers lagging behind by more than this many events will skip ahead.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Top-level event type broadcast by the core.
///
/// Serializes with an adjacent tag so host platforms can dispatch on `type`
/// before decoding the payload:
///
/// ```json
/// {"type": "Sync", "payload": {"event": "PageMerged", "run_id": "...", "page": 2, "items": 50}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Catalog synchronization lifecycle events.
    Sync(SyncEvent),
    /// Library content change events.
    Library(LibraryEvent),
    /// Network connectivity transitions.
    Connectivity(ConnectivityEvent),
}

/// Events emitted by the sync coordinator over the lifetime of a sync run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// A background full-sync walk started.
    Started {
        /// Identifier for this walk, stable across its page events.
        run_id: String,
        /// Human-readable description of the query being synced.
        query: String,
        /// Page size used for the walk.
        page_size: u32,
    },
    /// The first page of a query was refreshed from the server.
    FirstPageRefreshed {
        /// Human-readable description of the refreshed query.
        query: String,
        /// Number of items merged into the local mirror.
        items: usize,
    },
    /// A page beyond the first was fetched and merged during a walk.
    PageMerged {
        run_id: String,
        /// 1-based page number that was merged.
        page: u32,
        /// Number of items in the merged page.
        items: usize,
    },
    /// A full-sync walk reached the end of the server collection.
    Completed {
        run_id: String,
        /// Pages merged by this walk.
        pages: u32,
        /// Items merged across this walk's pages.
        total_items: usize,
    },
    /// A sync operation failed and was abandoned.
    Failed {
        /// Walk identifier when the failure happened mid-walk.
        run_id: Option<String>,
        message: String,
    },
    /// A walk was cancelled because a newer query replaced it.
    Superseded {
        run_id: String,
        /// Description of the cancelled walk's query.
        query: String,
    },
}

/// Events describing changes to locally mirrored library content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    /// Items were inserted or updated in the local mirror.
    ItemsUpdated { count: usize },
    /// Cached listening status for these items is stale and will be
    /// re-fetched on next access.
    ProgressInvalidated { item_ids: Vec<String> },
}

/// Network connectivity transitions observed by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ConnectivityEvent {
    /// The device regained network access.
    Online,
    /// The device lost network access. Reads continue from the local mirror.
    Offline,
}

/// Severity classification for routing events to host-side logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

impl CoreEvent {
    /// Returns a short human-readable description of the event.
    pub fn description(&self) -> String {
        match self {
            CoreEvent::Sync(event) => match event {
                SyncEvent::Started {
                    run_id,
                    query,
                    page_size,
                } => {
                    format!("Sync run {run_id} started for {query} (page size {page_size})")
                }
                SyncEvent::FirstPageRefreshed { query, items } => {
                    format!("First page refreshed for {query} ({items} items)")
                }
                SyncEvent::PageMerged {
                    run_id,
                    page,
                    items,
                } => {
                    format!("Sync run {run_id} merged page {page} ({items} items)")
                }
                SyncEvent::Completed {
                    run_id,
                    pages,
                    total_items,
                } => {
                    format!("Sync run {run_id} completed: {pages} pages, {total_items} items")
                }
                SyncEvent::Failed { run_id, message } => match run_id {
                    Some(id) => format!("Sync run {id} failed: {message}"),
                    None => format!("Sync failed: {message}"),
                },
                SyncEvent::Superseded { run_id, query } => {
                    format!("Sync run {run_id} superseded by {query}")
                }
            },
            CoreEvent::Library(event) => match event {
                LibraryEvent::ItemsUpdated { count } => {
                    format!("{count} library items updated")
                }
                LibraryEvent::ProgressInvalidated { item_ids } => {
                    format!("Progress invalidated for {} items", item_ids.len())
                }
            },
            CoreEvent::Connectivity(event) => match event {
                ConnectivityEvent::Online => "Network connection restored".to_string(),
                ConnectivityEvent::Offline => "Network connection lost".to_string(),
            },
        }
    }

    /// Returns the severity used when forwarding this event to logs.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Sync(event) => match event {
                SyncEvent::Failed { .. } => EventSeverity::Error,
                SyncEvent::Completed { .. } | SyncEvent::FirstPageRefreshed { .. } => {
                    EventSeverity::Info
                }
                SyncEvent::Started { .. }
                | SyncEvent::PageMerged { .. }
                | SyncEvent::Superseded { .. } => EventSeverity::Debug,
            },
            CoreEvent::Library(_) => EventSeverity::Debug,
            CoreEvent::Connectivity(event) => match event {
                ConnectivityEvent::Online => EventSeverity::Info,
                ConnectivityEvent::Offline => EventSeverity::Warning,
            },
        }
    }
}

/// Broadcast bus carrying [`CoreEvent`]s from the core to subscribers.
///
/// Cloning the bus is cheap and all clones share the same channel. Emitting
/// never blocks; events emitted while no subscriber exists are dropped.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a bus whose subscribers buffer up to `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emits an event to all current subscribers.
    ///
    /// Returns the number of subscribers the event was delivered to. Zero
    /// subscribers is not an error.
    pub fn emit(&self, event: CoreEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Creates a new subscription receiving all events emitted after this call.
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.sender.subscribe())
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Predicate deciding whether a subscription yields a given event.
pub type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A subscription to the [`EventBus`], optionally filtered.
pub struct EventStream {
    receiver: broadcast::Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    fn new(receiver: broadcast::Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Restricts the stream to events matching `predicate`.
    ///
    /// ```
    /// use core_runtime::events::{CoreEvent, EventBus};
    ///
    /// let bus = EventBus::default();
    /// let sync_only = bus
    ///     .subscribe()
    ///     .filter(|event| matches!(event, CoreEvent::Sync(_)));
    /// # drop(sync_only);
    /// ```
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Waits for the next matching event.
    ///
    /// Returns `None` once the bus has been dropped and the buffer drained.
    /// If this subscriber lagged behind, the missed events are skipped and
    /// the stream resumes from the newest buffered event.
    pub async fn recv(&mut self) -> Option<CoreEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if let Some(ref filter) = self.filter {
                        if !filter(&event) {
                            continue;
                        }
                    }
                    return Some(event);
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next matching event if one is already buffered.
    pub fn try_recv(&mut self) -> Option<CoreEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if let Some(ref filter) = self.filter {
                        if !filter(&event) {
                            continue;
                        }
                    }
                    return Some(event);
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}
