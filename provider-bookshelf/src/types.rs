//! Bookshelf API wire types
//!
//! Deserialization targets for the server's JSON payloads. Every field the
//! core does not strictly need is optional with a default, so older or
//! partially-configured servers still produce usable records.

use bridge_traits::catalog::ProgressSnapshot;
use serde::Deserialize;

/// One page of library items, as returned by the items listing endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemsPageResponse {
    #[serde(default)]
    pub results: Vec<ItemPayload>,
    /// Total matching items across all pages
    #[serde(default)]
    pub total: u64,
    /// Zero-based page index echoed by the server
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
}

/// A single library item as the server ships it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPayload {
    pub id: String,
    /// Last server-side update, milliseconds since the epoch
    #[serde(default)]
    pub updated_at: Option<i64>,
    #[serde(default)]
    pub media: MediaPayload,
}

/// Media block nested inside an item payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPayload {
    /// Total runtime in seconds
    #[serde(default)]
    pub duration: Option<f64>,
    /// Server-relative cover path, e.g. `/api/items/li_1/cover`
    #[serde(default)]
    pub cover_path: Option<String>,
    #[serde(default)]
    pub metadata: MetadataPayload,
}

/// Descriptive metadata nested inside the media block.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub series_name: Option<String>,
    #[serde(default)]
    pub series_sequence: Option<String>,
    #[serde(default)]
    pub collection_name: Option<String>,
    #[serde(default)]
    pub collection_sequence: Option<String>,
}

/// Per-user playback progress for one item.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPayload {
    /// Playback position in seconds
    #[serde(default)]
    pub current_time: Option<f64>,
    /// Item duration in seconds, as the progress endpoint knows it
    #[serde(default)]
    pub duration: Option<f64>,
    /// Completed fraction in `0.0..=1.0`
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub is_finished: bool,
}

impl ProgressPayload {
    /// Maps the wire payload onto the provider-neutral snapshot.
    pub fn into_snapshot(self) -> ProgressSnapshot {
        ProgressSnapshot {
            current_time_seconds: self.current_time,
            duration_seconds: self.duration,
            progress_ratio: self.progress,
            is_finished: self.is_finished,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_items_page_deserialization() {
        let json = r#"{
            "results": [
                {
                    "id": "li_1",
                    "updatedAt": 1700000000000,
                    "media": {
                        "duration": 3600.5,
                        "coverPath": "/api/items/li_1/cover",
                        "metadata": {
                            "title": "Dune",
                            "authorName": "Frank Herbert",
                            "seriesName": "Dune",
                            "seriesSequence": "1"
                        }
                    }
                }
            ],
            "total": 1234,
            "page": 0,
            "limit": 50
        }"#;

        let page: ItemsPageResponse = serde_json::from_str(json).unwrap();
        assert_eq!(page.total, 1234);
        assert_eq!(page.results.len(), 1);

        let item = &page.results[0];
        assert_eq!(item.id, "li_1");
        assert_eq!(item.updated_at, Some(1_700_000_000_000));
        assert_eq!(item.media.duration, Some(3600.5));
        assert_eq!(item.media.metadata.title.as_deref(), Some("Dune"));
        assert_eq!(
            item.media.metadata.author_name.as_deref(),
            Some("Frank Herbert")
        );
        assert_eq!(item.media.metadata.collection_name, None);
    }

    #[test]
    fn test_sparse_item_uses_defaults() {
        let json = r#"{"results": [{"id": "li_2"}]}"#;

        let page: ItemsPageResponse = serde_json::from_str(json).unwrap();
        assert_eq!(page.total, 0);

        let item = &page.results[0];
        assert_eq!(item.updated_at, None);
        assert_eq!(item.media.duration, None);
        assert_eq!(item.media.metadata.title, None);
    }

    #[test]
    fn test_progress_payload_into_snapshot() {
        let json = r#"{
            "currentTime": 1800.0,
            "duration": 3600.0,
            "progress": 0.5,
            "isFinished": false
        }"#;

        let payload: ProgressPayload = serde_json::from_str(json).unwrap();
        let snapshot = payload.into_snapshot();

        assert_eq!(snapshot.current_time_seconds, Some(1800.0));
        assert_eq!(snapshot.duration_seconds, Some(3600.0));
        assert_eq!(snapshot.progress_ratio, Some(0.5));
        assert!(!snapshot.is_finished);
    }

    #[test]
    fn test_partial_progress_payload() {
        let payload: ProgressPayload = serde_json::from_str(r#"{"isFinished": true}"#).unwrap();
        let snapshot = payload.into_snapshot();

        assert_eq!(snapshot.current_time_seconds, None);
        assert_eq!(snapshot.progress_ratio, None);
        assert!(snapshot.is_finished);
    }
}
