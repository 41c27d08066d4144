//! Library item repository trait and SQLite implementation.

use crate::error::{MirrorError, Result};
use crate::models::{LibraryItemRow, SortMode};
use async_trait::async_trait;
use bridge_traits::catalog::CatalogItem;
use sqlx::SqlitePool;
use tracing::debug;

/// Data access interface for the local catalog mirror.
#[async_trait]
pub trait LibraryItemRepository: Send + Sync {
    /// Find an item by its ID
    ///
    /// # Returns
    /// - `Ok(Some(item))` if found
    /// - `Ok(None)` if not found
    /// - `Err` if a database error occurs
    async fn find_by_id(&self, id: &str) -> Result<Option<CatalogItem>>;

    /// Insert or fully replace a batch of items in one transaction.
    ///
    /// Identity is the item `id`: an existing row is overwritten field by
    /// field, a new one is inserted. Re-merging the same batch is a no-op,
    /// and items absent from the batch are left untouched.
    async fn upsert_many(&self, items: &[CatalogItem]) -> Result<()>;

    /// Read one page of the mirrored catalog.
    ///
    /// `page` is 1-based. `search` filters by a case-insensitive substring
    /// match on title or author. A page past the end yields an empty list.
    ///
    /// # Errors
    /// Returns [`MirrorError::InvalidInput`] for `page == 0`.
    async fn read_page(
        &self,
        sort: SortMode,
        search: Option<&str>,
        page: u32,
        limit: u32,
    ) -> Result<Vec<CatalogItem>>;

    /// Count all mirrored items
    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of [`LibraryItemRepository`]
pub struct SqliteLibraryItemRepository {
    pool: SqlitePool,
}

impl SqliteLibraryItemRepository {
    /// Create a new repository over the given pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Escapes LIKE wildcards in `needle` and wraps it for a contains match.
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    format!("%{escaped}%")
}

#[async_trait]
impl LibraryItemRepository for SqliteLibraryItemRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<CatalogItem>> {
        let row = sqlx::query_as::<_, LibraryItemRow>("SELECT * FROM library_items WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(CatalogItem::from))
    }

    async fn upsert_many(&self, items: &[CatalogItem]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for item in items {
            let row = LibraryItemRow::from(item);
            sqlx::query(
                r#"
                INSERT INTO library_items (
                    id, title, author, series_name, series_sequence,
                    collection_name, collection_sequence, cover_ref,
                    updated_at, duration_ms
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    author = excluded.author,
                    series_name = excluded.series_name,
                    series_sequence = excluded.series_sequence,
                    collection_name = excluded.collection_name,
                    collection_sequence = excluded.collection_sequence,
                    cover_ref = excluded.cover_ref,
                    updated_at = excluded.updated_at,
                    duration_ms = excluded.duration_ms
                "#,
            )
            .bind(&row.id)
            .bind(&row.title)
            .bind(&row.author)
            .bind(&row.series_name)
            .bind(&row.series_sequence)
            .bind(&row.collection_name)
            .bind(&row.collection_sequence)
            .bind(&row.cover_ref)
            .bind(row.updated_at)
            .bind(row.duration_ms)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(count = items.len(), "Merged items into mirror");
        Ok(())
    }

    async fn read_page(
        &self,
        sort: SortMode,
        search: Option<&str>,
        page: u32,
        limit: u32,
    ) -> Result<Vec<CatalogItem>> {
        if page == 0 {
            return Err(MirrorError::InvalidInput {
                field: "page".to_string(),
                message: "pages are 1-based".to_string(),
            });
        }

        let order_clause = match sort {
            SortMode::Added => "ORDER BY updated_at IS NULL, updated_at DESC, id ASC",
            SortMode::Name => "ORDER BY title COLLATE NOCASE ASC, id ASC",
        };
        let offset = (page - 1).saturating_mul(limit);

        let rows = match search.map(str::trim).filter(|s| !s.is_empty()) {
            Some(needle) => {
                let pattern = like_pattern(needle);
                sqlx::query_as::<_, LibraryItemRow>(&format!(
                    "SELECT * FROM library_items \
                     WHERE (title LIKE ? ESCAPE '\\' OR author LIKE ? ESCAPE '\\') \
                     {order_clause} LIMIT ? OFFSET ?"
                ))
                .bind(&pattern)
                .bind(&pattern)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, LibraryItemRow>(&format!(
                    "SELECT * FROM library_items {order_clause} LIMIT ? OFFSET ?"
                ))
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.into_iter().map(CatalogItem::from).collect())
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_as("SELECT COUNT(*) as count FROM library_items")
            .fetch_one(&self.pool)
            .await
            .map(|row: (i64,)| row.0)?;

        Ok(count)
    }
}
