//! Row mapping and query types for the local catalog mirror.

use crate::error::MirrorError;
use bridge_traits::catalog::CatalogItem;
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Sort order for catalog listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Most recently updated first; items without a timestamp sort last.
    #[default]
    Added,
    /// Case-insensitive title order.
    Name,
}

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Added => "added",
            SortMode::Name => "name",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = MirrorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "added" => Ok(SortMode::Added),
            "name" => Ok(SortMode::Name),
            other => Err(MirrorError::InvalidInput {
                field: "sort".to_string(),
                message: format!("unknown sort mode '{other}', expected 'added' or 'name'"),
            }),
        }
    }
}

/// Database row backing one mirrored catalog item.
///
/// Timestamps are stored as epoch milliseconds to keep the schema free of
/// text date parsing.
#[derive(Debug, Clone, FromRow)]
pub struct LibraryItemRow {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub series_name: Option<String>,
    pub series_sequence: Option<String>,
    pub collection_name: Option<String>,
    pub collection_sequence: Option<String>,
    pub cover_ref: Option<String>,
    pub updated_at: Option<i64>,
    pub duration_ms: Option<i64>,
}

impl From<LibraryItemRow> for CatalogItem {
    fn from(row: LibraryItemRow) -> Self {
        CatalogItem {
            id: row.id,
            title: row.title,
            author: row.author,
            series_name: row.series_name,
            series_sequence: row.series_sequence,
            collection_name: row.collection_name,
            collection_sequence: row.collection_sequence,
            cover_ref: row.cover_ref,
            updated_at: row.updated_at.and_then(DateTime::from_timestamp_millis),
            duration_ms: row.duration_ms,
        }
    }
}

impl From<&CatalogItem> for LibraryItemRow {
    fn from(item: &CatalogItem) -> Self {
        LibraryItemRow {
            id: item.id.clone(),
            title: item.title.clone(),
            author: item.author.clone(),
            series_name: item.series_name.clone(),
            series_sequence: item.series_sequence.clone(),
            collection_name: item.collection_name.clone(),
            collection_sequence: item.collection_sequence.clone(),
            cover_ref: item.cover_ref.clone(),
            updated_at: item.updated_at.map(|ts| ts.timestamp_millis()),
            duration_ms: item.duration_ms,
        }
    }
}
