//! Listening-status classification.
//!
//! Maps a raw [`ProgressSnapshot`] onto the three-state [`ItemStatus`] shown
//! next to every library row. Classification is a pure function; the caching
//! and stickiness around it live in [`StatusCache`](crate::cache::StatusCache).

use bridge_traits::catalog::ProgressSnapshot;
use serde::{Deserialize, Serialize};

/// Completion ratio at or above which an item counts as finished.
const COMPLETED_RATIO: f64 = 0.99;

/// Completion ratio at or above which an item counts as started.
const STARTED_RATIO: f64 = 0.01;

/// Playback positions under this many seconds are treated as never started
/// when no duration is available to compute a ratio.
const MIN_STARTED_SECONDS: f64 = 5.0;

/// Derived listening state for one library item.
///
/// Serializes in camelCase (`"notStarted"`, `"inProgress"`, `"completed"`)
/// to match the host-facing event payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemStatus {
    /// No meaningful playback recorded.
    NotStarted,
    /// Playback started but not finished.
    InProgress,
    /// Finished, either by server flag or by completion ratio.
    Completed,
}

/// Classifies a progress snapshot.
///
/// Rules apply in strict precedence order; the first one that matches wins:
///
/// 1. The server's finished flag forces [`ItemStatus::Completed`].
/// 2. A reported completion ratio is classified directly.
/// 3. A playback position plus a usable duration (the snapshot's own, else
///    `hint_duration_secs` from the catalog item) yields a computed ratio.
/// 4. A playback position alone is classified by a coarse threshold.
/// 5. `known_finished` forces [`ItemStatus::Completed`].
/// 6. Everything else is [`ItemStatus::NotStarted`].
///
/// `known_finished` is the sticky marker kept by the cache for items a
/// server once reported finished; it outranks nothing except the empty
/// snapshot, so fresher data always wins.
pub fn derive_status(
    snapshot: &ProgressSnapshot,
    hint_duration_secs: Option<f64>,
    known_finished: bool,
) -> ItemStatus {
    if snapshot.is_finished {
        return ItemStatus::Completed;
    }

    if let Some(ratio) = snapshot.progress_ratio {
        return classify_ratio(ratio);
    }

    let effective_duration = snapshot.duration_seconds.or(hint_duration_secs);
    if let (Some(position), Some(duration)) = (snapshot.current_time_seconds, effective_duration) {
        if duration > 0.0 {
            return classify_ratio(position / duration);
        }
    }

    if let Some(position) = snapshot.current_time_seconds {
        if position < MIN_STARTED_SECONDS {
            return ItemStatus::NotStarted;
        }
        return ItemStatus::InProgress;
    }

    if known_finished {
        return ItemStatus::Completed;
    }

    ItemStatus::NotStarted
}

fn classify_ratio(ratio: f64) -> ItemStatus {
    if ratio >= COMPLETED_RATIO {
        ItemStatus::Completed
    } else if ratio >= STARTED_RATIO {
        ItemStatus::InProgress
    } else {
        ItemStatus::NotStarted
    }
}
