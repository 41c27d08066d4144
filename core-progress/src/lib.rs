//! Listening-status resolution for library items.
//!
//! Every row in a library screen shows whether the user has started or
//! finished that item. The server's progress endpoint is too slow and too
//! rate-limited to ask per row, so [`StatusCache`] coalesces concurrent
//! lookups into single fetches and keeps the answers fresh for a bounded
//! window, while [`InvalidationBus`] lets playback knock out entries it
//! knows have changed.

pub mod cache;
pub mod invalidation;
pub mod status;

pub use cache::StatusCache;
pub use invalidation::{
    spawn_invalidation_listener, InvalidationBus, InvalidationEvent,
    DEFAULT_INVALIDATION_BUFFER_SIZE,
};
pub use status::{derive_status, ItemStatus};
