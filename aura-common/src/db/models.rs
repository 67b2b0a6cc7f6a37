//! Persisted data models

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp format used by the device-export CSV
pub const OBSERVED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One deduplicated (title, artist) record with recency and sync state
///
/// Logical identity is (title, artist); `external_id` is the opaque
/// identifier assigned by the recognition source and is not unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CatalogEntry {
    /// Opaque source identifier, not a stable key
    pub external_id: String,
    /// Song title (half of the logical key)
    pub title: String,
    /// Song artist(s) (other half of the logical key)
    pub artist: String,
    /// Most recent observation time; only ever moves forward
    pub observed_at: NaiveDateTime,
    /// URL of the stream the song was observed on
    pub source_url: String,
    /// URL of the recognition detail page
    pub detail_url: String,
    /// Whether this entry has been synchronized to the remote playlist
    pub added_to_playlist: bool,
}

impl CatalogEntry {
    /// Cache/grouping key: normalized lowercase "title|artist"
    pub fn normalized_key(&self) -> String {
        normalized_key(&self.title, &self.artist)
    }
}

/// Normalized lowercase "title|artist" key
///
/// Used for in-batch grouping, compaction grouping, and the resolver
/// cache. Matches the NOCASE collation on the catalog table so the
/// in-memory view of identity agrees with the store's.
pub fn normalized_key(title: &str, artist: &str) -> String {
    format!(
        "{}|{}",
        title.trim().to_lowercase(),
        artist.trim().to_lowercase()
    )
}
