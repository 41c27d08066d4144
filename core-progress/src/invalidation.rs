//! Targeted cache invalidation.
//!
//! Lets playback (or any other subsystem) tell the status cache "forget
//! what you know about these ids" without depending on its types:
//! publishers put plain id sets on a broadcast bus, and a listener task
//! applies each one via [`StatusCache::invalidate`].

use std::sync::Arc;

use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::StatusCache;

/// Default buffer size for the invalidation broadcast channel.
pub const DEFAULT_INVALIDATION_BUFFER_SIZE: usize = 64;

/// Ids whose cached status must be forgotten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationEvent {
    pub item_ids: Vec<String>,
}

/// Broadcast channel carrying [`InvalidationEvent`]s.
///
/// Cloning is cheap and all clones share the same channel. Publishing never
/// blocks; events published while no listener exists are dropped.
#[derive(Clone)]
pub struct InvalidationBus {
    sender: broadcast::Sender<InvalidationEvent>,
}

impl InvalidationBus {
    /// Creates a bus whose listeners buffer up to `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an invalidation for `item_ids`.
    ///
    /// Returns the number of listeners it was delivered to. Zero listeners
    /// is not an error.
    pub fn publish(&self, item_ids: Vec<String>) -> usize {
        self.sender
            .send(InvalidationEvent { item_ids })
            .unwrap_or(0)
    }

    /// Subscribes to invalidations published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<InvalidationEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active listeners.
    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for InvalidationBus {
    fn default() -> Self {
        Self::new(DEFAULT_INVALIDATION_BUFFER_SIZE)
    }
}

impl std::fmt::Debug for InvalidationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvalidationBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Spawns the task applying published invalidations to `cache`.
///
/// Each applied event is re-announced on the core event bus as
/// [`LibraryEvent::ProgressInvalidated`] so hosts can refresh visible rows.
/// A listener that falls behind the channel buffer cannot know which ids it
/// missed, so it clears the whole cache and keeps going. The task ends when
/// every publisher handle is dropped.
pub fn spawn_invalidation_listener(
    bus: &InvalidationBus,
    cache: Arc<StatusCache>,
    events: EventBus,
) -> JoinHandle<()> {
    let mut receiver = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    cache.invalidate(&event.item_ids);
                    events.emit(CoreEvent::Library(LibraryEvent::ProgressInvalidated {
                        item_ids: event.item_ids,
                    }));
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Invalidation listener lagged, clearing status cache");
                    cache.clear();
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Invalidation bus closed, stopping listener");
                    break;
                }
            }
        }
    })
}
