//! Dedup Compactor
//!
//! Full-catalog pass that collapses multiple stored entries sharing a
//! (title, artist) key down to the most recent one. Repairs historical
//! duplicate insertions (for example rows created before the
//! case-insensitive key collation existed).

use std::collections::HashMap;

use aura_common::db::CatalogEntry;
use aura_common::{Error, Result};
use tracing::info;

use crate::catalog::{supersedes, CatalogStore};

/// Structured counts returned by a compaction pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionOutcome {
    /// Entries present before compaction
    pub original_count: usize,
    /// Entries present after compaction
    pub new_count: usize,
    /// Duplicates removed (original minus new)
    pub removed_count: usize,
}

/// Full-catalog duplicate collapse
pub struct Compactor {
    store: CatalogStore,
}

impl Compactor {
    pub fn new(store: CatalogStore) -> Self {
        Self { store }
    }

    /// Collapse duplicate keys to the most recent entry per key
    ///
    /// The replacement happens inside a single transaction, so readers
    /// observe either the original catalog or the compacted one. Running
    /// compact on an already-compacted catalog removes nothing.
    pub async fn compact(&self) -> Result<CompactionOutcome> {
        let entries = self.store.all().await?;
        let original_count = entries.len();

        let mut unique: HashMap<String, CatalogEntry> = HashMap::new();
        for entry in entries {
            let key = entry.normalized_key();
            let replaces = match unique.get(&key) {
                Some(incumbent) => supersedes(
                    entry.observed_at,
                    &entry.external_id,
                    incumbent.observed_at,
                    &incumbent.external_id,
                ),
                None => true,
            };
            if replaces {
                unique.insert(key, entry);
            }
        }

        let kept: Vec<CatalogEntry> = unique.into_values().collect();
        let new_count = kept.len();

        if new_count > original_count {
            return Err(Error::Internal(format!(
                "Compaction would grow the catalog: {original_count} -> {new_count}"
            )));
        }

        self.store.replace_all(&kept).await?;

        let outcome = CompactionOutcome {
            original_count,
            new_count,
            removed_count: original_count - new_count,
        };

        info!(
            original = outcome.original_count,
            new = outcome.new_count,
            removed = outcome.removed_count,
            "Compaction complete"
        );

        Ok(outcome)
    }
}
