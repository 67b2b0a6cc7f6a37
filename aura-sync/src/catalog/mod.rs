//! Catalog persistence and maintenance
//!
//! The catalog holds one entry per (title, artist) pair. The merge engine
//! folds freshly imported batches in with a last-write-wins policy; the
//! compactor repairs any historical duplicates with a full transactional
//! rewrite.

pub mod compact;
pub mod merge;
pub mod store;

pub use compact::{CompactionOutcome, Compactor};
pub use merge::{MergeEngine, MergeOutcome};
pub use store::CatalogStore;

use aura_common::db::models::normalized_key;
use chrono::NaiveDateTime;

/// A (title, artist) pair naming one logical catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SongKey {
    pub title: String,
    pub artist: String,
}

impl SongKey {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
        }
    }

    /// Normalized lowercase "title|artist" form
    pub fn normalized(&self) -> String {
        normalized_key(&self.title, &self.artist)
    }
}

impl std::fmt::Display for SongKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.title, self.artist)
    }
}

/// Last-write-wins ordering with a deterministic tie-break
///
/// A candidate observation replaces the incumbent when it is strictly
/// newer, or when the timestamps are equal and the candidate carries the
/// lexicographically smaller external id. The tie-break keeps merge and
/// compaction results independent of input order.
pub(crate) fn supersedes(
    candidate_observed_at: NaiveDateTime,
    candidate_external_id: &str,
    incumbent_observed_at: NaiveDateTime,
    incumbent_external_id: &str,
) -> bool {
    match candidate_observed_at.cmp(&incumbent_observed_at) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => candidate_external_id < incumbent_external_id,
    }
}
