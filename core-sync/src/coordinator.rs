//! Generation-guarded synchronization between the remote catalog and the
//! local mirror.
//!
//! The coordinator serves every read from the local mirror and lets the
//! network do nothing but improve the mirror through one merge path. A
//! monotonically increasing generation counter stands in for cancellation:
//! registering a fingerprint bumps the generation, and an in-flight walk
//! checks "still current" before each fetch and again before each merge, so
//! a superseded walk stops without racing stale pages into the mirror.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use bridge_traits::catalog::{CatalogItem, CatalogProvider};
use bridge_traits::network::NetworkMonitor;
use core_catalog::{LibraryItemRepository, SortMode};
use core_runtime::events::{ConnectivityEvent, LibraryEvent, SyncEvent};
use core_runtime::{CoreEvent, EventBus};

use crate::error::{Result, SyncError};
use crate::fingerprint::PageFingerprint;

/// Tuning knobs for the sync coordinator.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Spawn a background full-sync walk after each successful first-page
    /// refresh.
    pub background_sync: bool,

    /// Upper bound on pages fetched by one walk. Guards against a remote
    /// that keeps returning full pages and never signals a terminal page.
    pub max_pages: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            background_sync: true,
            max_pages: 1000,
        }
    }
}

/// Walk and paging position for the registered browsing sequence.
#[derive(Debug, Clone, Copy, Default)]
struct SyncCursor {
    /// Highest page merged into the mirror by the current walk.
    pages_merged: u32,
    /// Highest page the UI has consumed through reads.
    pages_loaded: u32,
    /// The last fetch came back short; the stream has no further pages.
    terminal: bool,
}

/// The currently authoritative fingerprint registration.
#[derive(Debug)]
struct ActiveQuery {
    fingerprint: PageFingerprint,
    generation: u64,
    cursor: SyncCursor,
    /// Held by a running walk so a second one is not started for the same
    /// registration.
    walk_active: bool,
}

#[derive(Debug, Default)]
struct CoordinatorState {
    /// Monotonic registration counter. Never reused, so a stale walk can
    /// always tell it has been superseded.
    generation: u64,
    active: Option<ActiveQuery>,
    /// Latched after an offline signal so repeated refresh attempts while
    /// offline emit it once per transition.
    offline_signaled: bool,
}

impl CoordinatorState {
    /// Registers `fingerprint` as current under a fresh generation.
    fn supersede(&mut self, fingerprint: &PageFingerprint) -> u64 {
        self.generation += 1;
        self.active = Some(ActiveQuery {
            fingerprint: fingerprint.clone(),
            generation: self.generation,
            cursor: SyncCursor::default(),
            walk_active: false,
        });
        self.generation
    }

    /// Returns the generation for `fingerprint`, registering it first when
    /// it does not match the active registration.
    fn ensure_current(&mut self, fingerprint: &PageFingerprint) -> u64 {
        match self.active {
            Some(ref active) if active.fingerprint == *fingerprint => active.generation,
            _ => self.supersede(fingerprint),
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        matches!(self.active, Some(ref active) if active.generation == generation)
    }

    fn cursor(&self, generation: u64) -> Option<SyncCursor> {
        self.active
            .as_ref()
            .filter(|active| active.generation == generation)
            .map(|active| active.cursor)
    }

    fn cursor_mut(&mut self, generation: u64) -> Option<&mut SyncCursor> {
        self.active
            .as_mut()
            .filter(|active| active.generation == generation)
            .map(|active| &mut active.cursor)
    }
}

/// Result of advancing the walk by one chunk.
enum ChunkOutcome {
    /// A full chunk was fetched and merged; more pages may remain.
    Merged { page: u32, items: usize },
    /// A short chunk was fetched and merged; the stream is complete.
    Terminal { items: usize },
    /// The stream was already complete; nothing was fetched.
    AlreadyTerminal,
    /// The fingerprint was superseded; nothing further will be merged.
    Superseded,
}

/// Reconciles the local mirror with the remote catalog, page by page.
///
/// One browsing sequence is authoritative at a time, identified by its
/// [`PageFingerprint`]. Reads never touch the network; refreshes and walks
/// never block reads. All collaborators are injected, so the coordinator
/// itself is storage- and transport-agnostic.
pub struct SyncCoordinator {
    provider: Arc<dyn CatalogProvider>,
    mirror: Arc<dyn LibraryItemRepository>,
    network: Arc<dyn NetworkMonitor>,
    event_bus: EventBus,
    config: SyncConfig,
    state: Arc<Mutex<CoordinatorState>>,
}

impl SyncCoordinator {
    pub fn new(
        provider: Arc<dyn CatalogProvider>,
        mirror: Arc<dyn LibraryItemRepository>,
        network: Arc<dyn NetworkMonitor>,
        event_bus: EventBus,
        config: SyncConfig,
    ) -> Self {
        Self {
            provider,
            mirror,
            network,
            event_bus,
            config,
            state: Arc::new(Mutex::new(CoordinatorState::default())),
        }
    }

    /// Clone sharing all state with `self`, for moving into a task.
    fn clone_for_task(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            mirror: Arc::clone(&self.mirror),
            network: Arc::clone(&self.network),
            event_bus: self.event_bus.clone(),
            config: self.config.clone(),
            state: Arc::clone(&self.state),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, CoordinatorState> {
        // Guards are never held across an await point.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reads the fingerprint's page from the local mirror.
    ///
    /// Never touches the network, so offline behaves identically to online;
    /// this is also the "show offline library" escape hatch after a failed
    /// first load. A warm caller receiving `Err` should keep whatever
    /// content it already has, since the mirror itself is unchanged by a
    /// failed read.
    pub async fn read_page(
        &self,
        fingerprint: &PageFingerprint,
        sort: SortMode,
    ) -> Result<Vec<CatalogItem>> {
        let items = self
            .mirror
            .read_page(
                sort,
                fingerprint.search(),
                fingerprint.page(),
                fingerprint.limit(),
            )
            .await?;
        Ok(items)
    }

    /// Cold-start read: attempt a first-page refresh, then serve the page
    /// from the mirror.
    ///
    /// The refresh may fail freely (offline, server down); the mirror read
    /// that follows is the single fallback, and its failure is the only
    /// error this layer surfaces for a retry screen.
    #[instrument(skip_all, fields(query = %fingerprint))]
    pub async fn initial_load(
        &self,
        fingerprint: &PageFingerprint,
        sort: SortMode,
    ) -> Result<Vec<CatalogItem>> {
        self.refresh_first_page(fingerprint).await;
        let items = self.read_page(fingerprint, sort).await?;
        {
            let mut state = self.lock_state();
            let generation = state.ensure_current(fingerprint);
            if let Some(cursor) = state.cursor_mut(generation) {
                cursor.pages_loaded = cursor.pages_loaded.max(fingerprint.page());
            }
        }
        Ok(items)
    }

    /// Refreshes page 1 from the remote catalog, merges it into the mirror,
    /// then starts a background full-sync walk for the rest of the stream.
    ///
    /// Registers the fingerprint under a fresh generation, superseding any
    /// walk still running for an older registration. Offline, this is a
    /// no-op apart from one offline event per transition. Fetch and merge
    /// failures are swallowed: the mirror keeps its last good state and
    /// listeners see a failure event instead.
    #[instrument(skip_all, fields(query = %fingerprint))]
    pub async fn refresh_first_page(&self, fingerprint: &PageFingerprint) {
        if !self.network.is_connected().await {
            let first_transition = {
                let mut state = self.lock_state();
                let first = !state.offline_signaled;
                state.offline_signaled = true;
                first
            };
            if first_transition {
                info!(query = %fingerprint, "Offline, serving mirror only");
                self.event_bus
                    .emit(CoreEvent::Connectivity(ConnectivityEvent::Offline));
            } else {
                debug!(query = %fingerprint, "Still offline, refresh skipped");
            }
            return;
        }

        let generation = {
            let mut state = self.lock_state();
            state.offline_signaled = false;
            state.supersede(fingerprint)
        };

        let items = match self
            .provider
            .fetch_page(1, fingerprint.limit(), fingerprint.search())
            .await
        {
            Ok(items) => items,
            Err(err) => {
                warn!(
                    query = %fingerprint,
                    error = %err,
                    "First-page fetch failed, keeping mirror state"
                );
                self.event_bus
                    .emit(CoreEvent::Sync(SyncEvent::Failed {
                        run_id: None,
                        message: err.to_string(),
                    }));
                return;
            }
        };
        let fetched = items.len();

        if !self.lock_state().is_current(generation) {
            debug!(query = %fingerprint, "Superseded before first-page merge");
            return;
        }
        if let Err(err) = self.mirror.upsert_many(&items).await {
            warn!(
                query = %fingerprint,
                error = %err,
                "First-page merge failed, keeping mirror state"
            );
            return;
        }

        let terminal = (fetched as u32) < fingerprint.limit();
        {
            let mut state = self.lock_state();
            if let Some(cursor) = state.cursor_mut(generation) {
                cursor.pages_merged = 1;
                cursor.pages_loaded = cursor.pages_loaded.max(1);
                cursor.terminal = terminal;
            }
        }
        debug!(query = %fingerprint, items = fetched, "First page refreshed");
        self.event_bus
            .emit(CoreEvent::Sync(SyncEvent::FirstPageRefreshed {
                query: fingerprint.to_string(),
                items: fetched,
            }));
        if fetched > 0 {
            self.event_bus
                .emit(CoreEvent::Library(LibraryEvent::ItemsUpdated { count: fetched }));
        }

        if terminal || !self.config.background_sync {
            return;
        }
        if !self.try_begin_walk(generation, false) {
            return;
        }
        let task = self.clone_for_task();
        let walk_fingerprint = fingerprint.clone();
        tokio::spawn(async move {
            task.run_full_sync(&walk_fingerprint, generation).await;
            task.end_walk(generation);
        });
    }

    /// Walks the stream's pages from the front, merging every chunk until a
    /// short page marks the end or a newer fingerprint supersedes the walk.
    ///
    /// Runs on the caller's task; `refresh_first_page` spawns the same walk
    /// in the background, so a direct call is only needed when the caller
    /// wants to await a fully warmed mirror. The chunk size is the
    /// fingerprint's limit, keeping sync pages and UI pages in the same
    /// units.
    #[instrument(skip_all, fields(query = %fingerprint))]
    pub async fn background_full_sync(&self, fingerprint: &PageFingerprint) {
        let generation = {
            let mut state = self.lock_state();
            state.ensure_current(fingerprint)
        };
        if !self.try_begin_walk(generation, true) {
            debug!(query = %fingerprint, "Walk already running, not starting another");
            return;
        }
        self.run_full_sync(fingerprint, generation).await;
        self.end_walk(generation);
    }

    /// Advances the browsing sequence by one page and returns that page.
    ///
    /// Pulls the next chunk through the same merge path as the full-sync
    /// walk first, then reads the next unconsumed page from the mirror, so
    /// the returned page reflects the mirror's sort order rather than raw
    /// fetch order. A fingerprint that does not match the current
    /// registration restarts the sequence at page 1. Fetch failures are
    /// swallowed; only a failed mirror read returns `Err`.
    #[instrument(skip_all, fields(query = %fingerprint))]
    pub async fn load_more(
        &self,
        fingerprint: &PageFingerprint,
        sort: SortMode,
    ) -> Result<Vec<CatalogItem>> {
        let generation = {
            let mut state = self.lock_state();
            state.ensure_current(fingerprint)
        };

        if self.network.is_connected().await {
            let run_id = Uuid::new_v4().to_string();
            match self.advance_one_chunk(fingerprint, generation, &run_id).await {
                Ok(_) => {}
                Err(SyncError::Fetch(err)) => {
                    warn!(
                        query = %fingerprint,
                        error = %err,
                        "Load-more fetch failed, serving mirror content"
                    );
                    self.event_bus
                        .emit(CoreEvent::Sync(SyncEvent::Failed {
                            run_id: Some(run_id),
                            message: err.to_string(),
                        }));
                }
                Err(SyncError::Mirror(err)) => {
                    warn!(
                        query = %fingerprint,
                        error = %err,
                        "Load-more merge failed, serving mirror content"
                    );
                }
            }
        }

        let next_page = {
            let state = self.lock_state();
            state
                .cursor(generation)
                .map(|cursor| cursor.pages_loaded + 1)
                .unwrap_or(fingerprint.page())
        };
        let items = match self
            .mirror
            .read_page(sort, fingerprint.search(), next_page, fingerprint.limit())
            .await
        {
            Ok(items) => items,
            Err(err) => {
                warn!(
                    query = %fingerprint,
                    page = next_page,
                    error = %err,
                    "Load-more mirror read failed"
                );
                return Err(err.into());
            }
        };

        // An empty page does not consume the slot: the walk may still be
        // filling the mirror, and the next call should see that page.
        if !items.is_empty() {
            let mut state = self.lock_state();
            if let Some(cursor) = state.cursor_mut(generation) {
                cursor.pages_loaded = cursor.pages_loaded.max(next_page);
            }
        }
        Ok(items)
    }

    /// Drops the browsing sequence and starts a new one for `fingerprint`.
    ///
    /// The old registration is superseded before any network access, so an
    /// in-flight walk stops merging even while offline. Call this whenever
    /// the query text changes.
    #[instrument(skip_all, fields(query = %fingerprint))]
    pub async fn restart(&self, fingerprint: &PageFingerprint) {
        {
            let mut state = self.lock_state();
            state.supersede(fingerprint);
        }
        info!(query = %fingerprint, "Browsing sequence restarted");
        self.refresh_first_page(fingerprint).await;
    }

    /// Marks a walk as running for `generation`. Returns false when the
    /// registration is gone or already has a walk.
    fn try_begin_walk(&self, generation: u64, from_front: bool) -> bool {
        let mut state = self.lock_state();
        match state.active {
            Some(ref mut active) if active.generation == generation && !active.walk_active => {
                active.walk_active = true;
                if from_front {
                    active.cursor.pages_merged = 0;
                    active.cursor.terminal = false;
                }
                true
            }
            _ => false,
        }
    }

    fn end_walk(&self, generation: u64) {
        let mut state = self.lock_state();
        if let Some(ref mut active) = state.active {
            if active.generation == generation {
                active.walk_active = false;
            }
        }
    }

    /// One full-sync walk under an already-registered generation.
    async fn run_full_sync(&self, fingerprint: &PageFingerprint, generation: u64) {
        let run_id = Uuid::new_v4().to_string();
        info!(run_id = %run_id, query = %fingerprint, "Full sync started");
        self.event_bus
            .emit(CoreEvent::Sync(SyncEvent::Started {
                run_id: run_id.clone(),
                query: fingerprint.to_string(),
                page_size: fingerprint.limit(),
            }));

        let mut pages = 0u32;
        let mut total_items = 0usize;
        loop {
            match self.advance_one_chunk(fingerprint, generation, &run_id).await {
                Ok(ChunkOutcome::Merged { page, items }) => {
                    pages += 1;
                    total_items += items;
                    if page >= self.config.max_pages {
                        warn!(run_id = %run_id, page, "Page cap reached, ending walk");
                        break;
                    }
                }
                Ok(ChunkOutcome::Terminal { items }) => {
                    pages += 1;
                    total_items += items;
                    break;
                }
                Ok(ChunkOutcome::AlreadyTerminal) => break,
                Ok(ChunkOutcome::Superseded) => {
                    debug!(run_id = %run_id, query = %fingerprint, "Walk superseded, stopping");
                    self.event_bus
                        .emit(CoreEvent::Sync(SyncEvent::Superseded {
                            run_id,
                            query: fingerprint.to_string(),
                        }));
                    return;
                }
                Err(SyncError::Fetch(err)) => {
                    warn!(
                        run_id = %run_id,
                        error = %err,
                        "Chunk fetch failed, keeping mirror state"
                    );
                    self.event_bus
                        .emit(CoreEvent::Sync(SyncEvent::Failed {
                            run_id: Some(run_id),
                            message: err.to_string(),
                        }));
                    return;
                }
                Err(SyncError::Mirror(err)) => {
                    warn!(
                        run_id = %run_id,
                        error = %err,
                        "Chunk merge failed, keeping mirror state"
                    );
                    return;
                }
            }
        }

        info!(run_id = %run_id, pages, total_items, "Full sync completed");
        self.event_bus
            .emit(CoreEvent::Sync(SyncEvent::Completed {
                run_id,
                pages,
                total_items,
            }));
    }

    /// Fetches and merges the next unmerged page of the stream.
    ///
    /// Checks "still current" before the fetch and again before the merge,
    /// so a superseded caller never writes a stale query's results into the
    /// mirror.
    async fn advance_one_chunk(
        &self,
        fingerprint: &PageFingerprint,
        generation: u64,
        run_id: &str,
    ) -> Result<ChunkOutcome> {
        let next_page = {
            let state = self.lock_state();
            match state.cursor(generation) {
                None => return Ok(ChunkOutcome::Superseded),
                Some(cursor) if cursor.terminal => return Ok(ChunkOutcome::AlreadyTerminal),
                Some(cursor) => cursor.pages_merged + 1,
            }
        };

        let items = self
            .provider
            .fetch_page(next_page, fingerprint.limit(), fingerprint.search())
            .await?;
        let fetched = items.len();

        if !self.lock_state().is_current(generation) {
            return Ok(ChunkOutcome::Superseded);
        }
        self.mirror.upsert_many(&items).await?;

        let terminal = (fetched as u32) < fingerprint.limit();
        {
            let mut state = self.lock_state();
            match state.cursor_mut(generation) {
                Some(cursor) => {
                    cursor.pages_merged = cursor.pages_merged.max(next_page);
                    if terminal {
                        cursor.terminal = true;
                    }
                }
                // Superseded mid-merge. The merged rows are still valid
                // per-id data, but this walk is done.
                None => return Ok(ChunkOutcome::Superseded),
            }
        }

        debug!(run_id = %run_id, page = next_page, items = fetched, "Merged page");
        self.event_bus
            .emit(CoreEvent::Sync(SyncEvent::PageMerged {
                run_id: run_id.to_string(),
                page: next_page,
                items: fetched,
            }));
        if fetched > 0 {
            self.event_bus
                .emit(CoreEvent::Library(LibraryEvent::ItemsUpdated { count: fetched }));
        }

        Ok(if terminal {
            ChunkOutcome::Terminal { items: fetched }
        } else {
            ChunkOutcome::Merged {
                page: next_page,
                items: fetched,
            }
        })
    }
}
