//! Catalog Store
//!
//! Key-value persistence for catalog entries over SQLite. The key is
//! (title, artist) with NOCASE collation, so lookups are
//! case-insensitive. `replace_all` is a single transaction: readers see
//! either the old catalog or the new one, never an empty intermediate
//! state.

use aura_common::db::CatalogEntry;
use aura_common::Result;
use sqlx::SqlitePool;
use tracing::debug;

/// SQLite-backed catalog store keyed by (title, artist)
#[derive(Clone)]
pub struct CatalogStore {
    db: SqlitePool,
}

impl CatalogStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Look up one entry by its logical key (case-insensitive)
    pub async fn get(&self, title: &str, artist: &str) -> Result<Option<CatalogEntry>> {
        let entry = sqlx::query_as::<_, CatalogEntry>(
            r#"
            SELECT external_id, title, artist, observed_at, source_url, detail_url,
                   added_to_playlist
            FROM catalog_entries
            WHERE title = ? AND artist = ?
            "#,
        )
        .bind(title)
        .bind(artist)
        .fetch_optional(&self.db)
        .await?;

        Ok(entry)
    }

    /// Read the entire catalog
    pub async fn all(&self) -> Result<Vec<CatalogEntry>> {
        let entries = sqlx::query_as::<_, CatalogEntry>(
            r#"
            SELECT external_id, title, artist, observed_at, source_url, detail_url,
                   added_to_playlist
            FROM catalog_entries
            ORDER BY title, artist
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }

    /// Insert a new entry
    pub async fn insert(&self, entry: &CatalogEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO catalog_entries
                (title, artist, external_id, observed_at, source_url, detail_url,
                 added_to_playlist)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.title)
        .bind(&entry.artist)
        .bind(&entry.external_id)
        .bind(entry.observed_at)
        .bind(&entry.source_url)
        .bind(&entry.detail_url)
        .bind(entry.added_to_playlist)
        .execute(&self.db)
        .await?;

        debug!(title = %entry.title, artist = %entry.artist, "Inserted catalog entry");
        Ok(())
    }

    /// Overwrite the observation fields of an existing entry
    ///
    /// Updates external_id, observed_at, source_url, and detail_url in
    /// place. `added_to_playlist` is deliberately left untouched so a
    /// re-observed song is not re-queued for the playlist.
    pub async fn update_observation(&self, entry: &CatalogEntry) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE catalog_entries
            SET external_id = ?, observed_at = ?, source_url = ?, detail_url = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE title = ? AND artist = ?
            "#,
        )
        .bind(&entry.external_id)
        .bind(entry.observed_at)
        .bind(&entry.source_url)
        .bind(&entry.detail_url)
        .bind(&entry.title)
        .bind(&entry.artist)
        .execute(&self.db)
        .await?;

        debug!(title = %entry.title, artist = %entry.artist, "Updated catalog entry");
        Ok(())
    }

    /// Replace the full catalog contents in one transaction
    pub async fn replace_all(&self, entries: &[CatalogEntry]) -> Result<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM catalog_entries")
            .execute(&mut *tx)
            .await?;

        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO catalog_entries
                    (title, artist, external_id, observed_at, source_url, detail_url,
                     added_to_playlist)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&entry.title)
            .bind(&entry.artist)
            .bind(&entry.external_id)
            .bind(entry.observed_at)
            .bind(&entry.source_url)
            .bind(&entry.detail_url)
            .bind(entry.added_to_playlist)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(count = entries.len(), "Replaced catalog contents");
        Ok(())
    }

    /// Mark an entry as synchronized to the remote playlist
    pub async fn mark_added(&self, title: &str, artist: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE catalog_entries
            SET added_to_playlist = 1, updated_at = CURRENT_TIMESTAMP
            WHERE title = ? AND artist = ?
            "#,
        )
        .bind(title)
        .bind(artist)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Total number of catalog entries
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM catalog_entries")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    /// Number of entries not yet synchronized to the playlist
    pub async fn count_pending(&self) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM catalog_entries WHERE added_to_playlist = 0")
                .fetch_one(&self.db)
                .await?;
        Ok(count)
    }
}
