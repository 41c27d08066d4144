//! Per-item listening status cache.
//!
//! Answers "where does the user stand with this item" from a small in-memory
//! map. Progress is fetched from the server at most once per item per
//! freshness window, and concurrent callers for the same id share a single
//! in-flight fetch instead of racing their own.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use bridge_traits::catalog::{CatalogItem, CatalogProvider, ProgressSnapshot};
use bridge_traits::time::Clock;
use chrono::{DateTime, Utc};
use core_runtime::config::StatusCacheConfig;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tracing::debug;

use crate::status::{derive_status, ItemStatus};

/// One resolved status and when it was fetched.
#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    status: ItemStatus,
    fetched_at: DateTime<Utc>,
}

type SharedFlight = Shared<BoxFuture<'static, ItemStatus>>;

/// A registered in-flight fetch.
///
/// The ticket records which flight owns the pending slot: a flight clears
/// the slot only while its ticket still matches, so a fetch finishing after
/// an invalidation cannot wipe out a newer flight registered since.
struct PendingFlight {
    ticket: u64,
    future: SharedFlight,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    pending: HashMap<String, PendingFlight>,
    /// Ids the server once reported finished. Survives invalidation and
    /// never expires; breaks the tie when a later snapshot comes back empty.
    known_finished: HashSet<String>,
    next_ticket: u64,
}

/// Request-coalescing cache mapping item ids to their [`ItemStatus`].
///
/// List screens resolve a status for every visible row, so the cache keeps
/// the hot path to a map lookup. A miss (or an entry past
/// [`StatusCacheConfig::ttl`]) triggers one progress fetch; callers arriving
/// while that fetch is in flight await the same shared future.
///
/// Freshness is measured against an injected [`Clock`], and resolution never
/// returns an error: unobtainable progress classifies through the empty
/// snapshot instead.
pub struct StatusCache {
    provider: Arc<dyn CatalogProvider>,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
    inner: Arc<Mutex<CacheInner>>,
}

impl StatusCache {
    /// Creates a cache resolving progress through `provider`, with entry
    /// freshness measured against `clock`.
    pub fn new(
        provider: Arc<dyn CatalogProvider>,
        clock: Arc<dyn Clock>,
        config: StatusCacheConfig,
    ) -> Self {
        let ttl = chrono::Duration::from_std(config.ttl).unwrap_or(chrono::Duration::MAX);
        Self {
            provider,
            clock,
            ttl,
            inner: Arc::new(Mutex::new(CacheInner::default())),
        }
    }

    /// Resolves the listening status for one item.
    ///
    /// `hint` is the catalog row being rendered; its duration fills in for
    /// servers whose progress endpoint omits one.
    ///
    /// Never fails. A fetch that errors out resolves through the empty
    /// snapshot, so the worst outcome is [`ItemStatus::NotStarted`] (or
    /// [`ItemStatus::Completed`] for an item already known finished).
    pub async fn resolve(&self, item_id: &str, hint: &CatalogItem) -> ItemStatus {
        // Freshness check, pending check, and new-flight registration happen
        // under one lock acquisition. There is no suspension point between
        // "no flight registered" and "flight registered", so two racing
        // callers can never both start a fetch.
        let (flight, registered_here) = {
            let mut inner = self.lock_inner();

            if let Some(pending) = inner.pending.get(item_id) {
                debug!(item_id, "Joining in-flight status fetch");
                (pending.future.clone(), false)
            } else if let Some(status) = self.fresh_status(&inner, item_id) {
                return status;
            } else {
                let ticket = inner.next_ticket;
                inner.next_ticket += 1;

                let flight = self.build_flight(item_id.to_string(), hint.clone(), ticket);
                inner.pending.insert(
                    item_id.to_string(),
                    PendingFlight {
                        ticket,
                        future: flight.clone(),
                    },
                );
                (flight, true)
            }
        };

        // A detached driver polls the flight even if every caller is
        // dropped: a started fetch always completes and lands in the cache.
        if registered_here {
            tokio::spawn(flight.clone());
        }

        flight.await
    }

    /// Drops the cached entry and any pending registration for each id.
    ///
    /// The next `resolve` for an invalidated id performs a fresh fetch;
    /// nothing is re-fetched eagerly. The known-finished marker is kept.
    pub fn invalidate(&self, item_ids: &[String]) {
        let mut inner = self.lock_inner();
        for item_id in item_ids {
            inner.entries.remove(item_id);
            inner.pending.remove(item_id);
        }
        debug!(count = item_ids.len(), "Invalidated cached statuses");
    }

    /// Drops every cached entry and pending registration.
    ///
    /// For listeners that lost track of which ids went stale: forget
    /// everything rather than guess.
    pub fn clear(&self) {
        let mut inner = self.lock_inner();
        let dropped = inner.entries.len();
        inner.entries.clear();
        inner.pending.clear();
        debug!(dropped, "Cleared status cache");
    }

    /// Number of resolved statuses currently cached.
    pub fn cached_len(&self) -> usize {
        self.lock_inner().entries.len()
    }

    fn fresh_status(&self, inner: &CacheInner, item_id: &str) -> Option<ItemStatus> {
        let entry = inner.entries.get(item_id)?;
        if self.clock.now() - entry.fetched_at < self.ttl {
            Some(entry.status)
        } else {
            None
        }
    }

    /// Builds the shared future performing one progress fetch.
    ///
    /// The future owns everything it touches so it can outlive the caller.
    /// On completion it stores the derived status and releases its own
    /// pending slot.
    fn build_flight(&self, item_id: String, hint: CatalogItem, ticket: u64) -> SharedFlight {
        let provider = Arc::clone(&self.provider);
        let clock = Arc::clone(&self.clock);
        let inner = Arc::clone(&self.inner);

        async move {
            let snapshot = match provider.fetch_progress(&item_id).await {
                Ok(Some(snapshot)) => snapshot,
                Ok(None) => ProgressSnapshot::default(),
                Err(error) => {
                    debug!(
                        item_id = %item_id,
                        error = %error,
                        "Progress fetch failed, resolving from empty snapshot"
                    );
                    ProgressSnapshot::default()
                }
            };

            let mut guard = inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if snapshot.is_finished {
                guard.known_finished.insert(item_id.clone());
            }
            let sticky = guard.known_finished.contains(&item_id);
            let status = derive_status(&snapshot, hint.duration_secs(), sticky);
            guard.entries.insert(
                item_id.clone(),
                CacheEntry {
                    status,
                    fetched_at: clock.now(),
                },
            );
            if guard.pending.get(&item_id).map(|p| p.ticket) == Some(ticket) {
                guard.pending.remove(&item_id);
            }
            status
        }
        .boxed()
        .shared()
    }

    fn lock_inner(&self) -> MutexGuard<'_, CacheInner> {
        // Guards are never held across an await point.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for StatusCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusCache")
            .field("cached", &self.cached_len())
            .field("ttl", &self.ttl)
            .finish()
    }
}
