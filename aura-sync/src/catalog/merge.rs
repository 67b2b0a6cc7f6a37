//! Merge Engine
//!
//! Folds a batch of freshly parsed listen records into the catalog store
//! using last-write-wins by observation time, keyed by (title, artist).

use std::collections::HashMap;

use aura_common::db::models::normalized_key;
use aura_common::Result;
use tracing::{debug, info};

use crate::catalog::{supersedes, CatalogStore};
use crate::import::ListenRecord;

/// Structured counts returned by a merge pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Raw records in the input batch
    pub scanned: usize,
    /// Distinct (title, artist) keys after in-batch deduplication
    pub unique_in_batch: usize,
    /// New catalog entries created
    pub inserted: usize,
    /// Existing entries overwritten by a newer observation
    pub updated: usize,
    /// Candidates discarded because the stored entry was at least as recent
    pub unchanged: usize,
}

/// Last-write-wins merge of import batches into the catalog
pub struct MergeEngine {
    store: CatalogStore,
}

impl MergeEngine {
    pub fn new(store: CatalogStore) -> Self {
        Self { store }
    }

    /// Merge a parsed batch into the catalog
    ///
    /// The batch is first reduced to one candidate per normalized
    /// (title, artist) key, keeping the record with the latest
    /// observation (ties go to the smaller external id). Each candidate
    /// is then applied against the store: inserted when absent,
    /// overwritten when strictly newer than the stored entry, and
    /// discarded otherwise. `added_to_playlist` is never reset by a
    /// merge.
    pub async fn merge(&self, records: Vec<ListenRecord>) -> Result<MergeOutcome> {
        let scanned = records.len();

        // Reduce the batch to the winning record per key
        let mut batch: HashMap<String, ListenRecord> = HashMap::new();
        for record in records {
            let key = normalized_key(&record.title, &record.artist);
            let replaces = match batch.get(&key) {
                Some(incumbent) => supersedes(
                    record.observed_at,
                    &record.external_id,
                    incumbent.observed_at,
                    &incumbent.external_id,
                ),
                None => true,
            };
            if replaces {
                batch.insert(key, record);
            }
        }

        let unique_in_batch = batch.len();
        let mut inserted = 0;
        let mut updated = 0;
        let mut unchanged = 0;

        for record in batch.into_values() {
            match self.store.get(&record.title, &record.artist).await? {
                None => {
                    self.store.insert(&record.into_entry()).await?;
                    inserted += 1;
                }
                // Strictly-newer observations overwrite; an equal
                // timestamp keeps the stored entry.
                Some(stored) if record.observed_at > stored.observed_at => {
                    self.store.update_observation(&record.into_entry()).await?;
                    updated += 1;
                }
                Some(_) => {
                    debug!(
                        title = %record.title,
                        artist = %record.artist,
                        "Discarding stale observation"
                    );
                    unchanged += 1;
                }
            }
        }

        let outcome = MergeOutcome {
            scanned,
            unique_in_batch,
            inserted,
            updated,
            unchanged,
        };

        info!(
            scanned = outcome.scanned,
            unique = outcome.unique_in_batch,
            inserted = outcome.inserted,
            updated = outcome.updated,
            unchanged = outcome.unchanged,
            "Merge complete"
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    async fn setup_engine() -> (MergeEngine, CatalogStore) {
        let pool = aura_common::db::init::init_memory_database().await.unwrap();
        let store = CatalogStore::new(pool);
        (MergeEngine::new(store.clone()), store)
    }

    fn record(title: &str, artist: &str, external_id: &str, observed_at: &str) -> ListenRecord {
        ListenRecord {
            external_id: external_id.to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
            observed_at: NaiveDateTime::parse_from_str(observed_at, "%Y-%m-%d %H:%M:%S").unwrap(),
            source_url: format!("https://stream.example/{external_id}"),
            detail_url: format!("https://detail.example/{external_id}"),
        }
    }

    #[tokio::test]
    async fn test_batch_deduplicates_by_key_keeping_latest() {
        let (engine, store) = setup_engine().await;

        let outcome = engine
            .merge(vec![
                record("Song A", "Artist X", "acr-1", "2024-01-01 10:00:00"),
                record("Song A", "Artist X", "acr-2", "2024-01-02 09:00:00"),
            ])
            .await
            .unwrap();

        assert_eq!(outcome.scanned, 2);
        assert_eq!(outcome.unique_in_batch, 1);
        assert_eq!(outcome.inserted, 1);
        assert_eq!(store.count().await.unwrap(), 1);

        // The later observation's fields were retained
        let stored = store.get("Song A", "Artist X").await.unwrap().unwrap();
        assert_eq!(stored.external_id, "acr-2");
        assert_eq!(stored.source_url, "https://stream.example/acr-2");
        assert_eq!(stored.detail_url, "https://detail.example/acr-2");
    }

    #[tokio::test]
    async fn test_batch_keys_are_case_insensitive() {
        let (engine, store) = setup_engine().await;

        engine
            .merge(vec![
                record("Song A", "Artist X", "acr-1", "2024-01-01 10:00:00"),
                record("song a", "ARTIST X", "acr-2", "2024-01-02 09:00:00"),
            ])
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_newer_observation_overwrites_stored_entry() {
        let (engine, store) = setup_engine().await;

        engine
            .merge(vec![record("Song A", "Artist X", "acr-1", "2024-01-01 10:00:00")])
            .await
            .unwrap();
        let outcome = engine
            .merge(vec![record("Song A", "Artist X", "acr-2", "2024-01-02 09:00:00")])
            .await
            .unwrap();

        assert_eq!(outcome.updated, 1);
        let stored = store.get("Song A", "Artist X").await.unwrap().unwrap();
        assert_eq!(stored.external_id, "acr-2");
    }

    #[tokio::test]
    async fn test_stale_observation_is_discarded() {
        let (engine, store) = setup_engine().await;

        engine
            .merge(vec![record("Song A", "Artist X", "acr-2", "2024-01-02 09:00:00")])
            .await
            .unwrap();
        let outcome = engine
            .merge(vec![record("Song A", "Artist X", "acr-1", "2024-01-01 10:00:00")])
            .await
            .unwrap();

        assert_eq!(outcome.unchanged, 1);
        assert_eq!(outcome.updated, 0);
        let stored = store.get("Song A", "Artist X").await.unwrap().unwrap();
        assert_eq!(stored.external_id, "acr-2");
    }

    #[tokio::test]
    async fn test_equal_timestamp_does_not_overwrite_store() {
        let (engine, store) = setup_engine().await;

        engine
            .merge(vec![record("Song A", "Artist X", "acr-1", "2024-01-01 10:00:00")])
            .await
            .unwrap();
        let outcome = engine
            .merge(vec![record("Song A", "Artist X", "acr-0", "2024-01-01 10:00:00")])
            .await
            .unwrap();

        assert_eq!(outcome.unchanged, 1);
        let stored = store.get("Song A", "Artist X").await.unwrap().unwrap();
        assert_eq!(stored.external_id, "acr-1");
    }

    #[tokio::test]
    async fn test_in_batch_tie_keeps_smaller_external_id() {
        let (engine, store) = setup_engine().await;

        engine
            .merge(vec![
                record("Song A", "Artist X", "acr-2", "2024-01-01 10:00:00"),
                record("Song A", "Artist X", "acr-1", "2024-01-01 10:00:00"),
            ])
            .await
            .unwrap();

        let stored = store.get("Song A", "Artist X").await.unwrap().unwrap();
        assert_eq!(stored.external_id, "acr-1");
    }

    #[tokio::test]
    async fn test_merge_preserves_playlist_flag() {
        let (engine, store) = setup_engine().await;

        engine
            .merge(vec![record("Song A", "Artist X", "acr-1", "2024-01-01 10:00:00")])
            .await
            .unwrap();
        store.mark_added("Song A", "Artist X").await.unwrap();

        engine
            .merge(vec![record("Song A", "Artist X", "acr-2", "2024-01-02 09:00:00")])
            .await
            .unwrap();

        let stored = store.get("Song A", "Artist X").await.unwrap().unwrap();
        assert!(stored.added_to_playlist);
    }

    #[tokio::test]
    async fn test_cumulative_maximum_across_merges() {
        let (engine, store) = setup_engine().await;

        engine
            .merge(vec![record("Song A", "Artist X", "acr-1", "2024-01-03 08:00:00")])
            .await
            .unwrap();
        engine
            .merge(vec![record("Song A", "Artist X", "acr-2", "2024-01-01 10:00:00")])
            .await
            .unwrap();
        engine
            .merge(vec![record("Song A", "Artist X", "acr-3", "2024-01-02 09:00:00")])
            .await
            .unwrap();

        let stored = store.get("Song A", "Artist X").await.unwrap().unwrap();
        assert_eq!(
            stored.observed_at,
            NaiveDateTime::parse_from_str("2024-01-03 08:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
        );
    }
}
