//! Candidate Resolver
//!
//! Maps a (title, artist) pair to the best-matching remote video id.
//! Results are cached for the process lifetime so repeat lookups never
//! hit the network; stale mappings are an accepted risk.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use aura_common::db::models::normalized_key;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::SongKey;
use crate::video::{VideoApi, VideoApiError, VideoCandidate};

/// Search results requested per lookup
const SEARCH_RESULTS: u32 = 5;

/// Case-insensitive markers identifying an official upload: the word
/// "official" anywhere in the snippet, or a VEVO label channel.
const OFFICIAL_MARKERS: [&str; 2] = ["official", "vevo"];

/// Per-song resolution outcome
///
/// Failures are data, not exceptions: one song failing to resolve never
/// aborts the rest of a batch.
#[derive(Debug)]
pub enum Resolution {
    /// Best-match video id
    Resolved(String),
    /// The search returned no candidates
    NotFound,
    /// The remote call failed; not retried
    Failed(VideoApiError),
}

impl Resolution {
    pub fn video_id(&self) -> Option<&str> {
        match self {
            Resolution::Resolved(id) => Some(id),
            _ => None,
        }
    }
}

/// Process-wide search result cache
///
/// Keyed by the normalized lowercase "title|artist" form. Append-only
/// for its lifetime; no invalidation. The lock is held only for map
/// access, never across an await, so concurrent callers are safe.
#[derive(Default)]
pub struct ResolutionCache {
    entries: Mutex<HashMap<String, String>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().expect("cache lock poisoned").get(key).cloned()
    }

    pub fn insert(&self, key: String, video_id: String) {
        self.entries.lock().expect("cache lock poisoned").insert(key, video_id);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Inter-call delay policy for outbound searches
///
/// The base delay applies to small batches; batches above the threshold
/// widen the gap to stay under the remote quota.
#[derive(Debug, Clone, Copy)]
pub struct ThrottleConfig {
    pub base_delay_ms: u64,
    pub large_batch_delay_ms: u64,
    pub large_batch_threshold: usize,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 100,
            large_batch_delay_ms: 1000,
            large_batch_threshold: 25,
        }
    }
}

impl ThrottleConfig {
    /// Delay applied before each remote search in a batch of `len` songs
    pub fn delay_for_batch(&self, len: usize) -> Duration {
        if len > self.large_batch_threshold {
            Duration::from_millis(self.large_batch_delay_ms)
        } else {
            Duration::from_millis(self.base_delay_ms)
        }
    }
}

/// Maps (title, artist) pairs to video ids via search plus heuristics
pub struct CandidateResolver {
    api: Arc<dyn VideoApi>,
    cache: Arc<ResolutionCache>,
    throttle: ThrottleConfig,
}

impl CandidateResolver {
    pub fn new(api: Arc<dyn VideoApi>, cache: Arc<ResolutionCache>, throttle: ThrottleConfig) -> Self {
        Self { api, cache, throttle }
    }

    /// Resolve a single song, consulting the cache first
    pub async fn resolve(&self, title: &str, artist: &str) -> Resolution {
        self.resolve_throttled(title, artist, None).await
    }

    /// Resolve a batch sequentially, in input order
    ///
    /// A configurable delay is inserted before each remote search (cache
    /// hits pay nothing). Cancellation stops further remote calls; songs
    /// already resolved are returned.
    pub async fn resolve_batch(
        &self,
        songs: &[SongKey],
        cancel: &CancellationToken,
    ) -> Vec<(SongKey, Resolution)> {
        let delay = self.throttle.delay_for_batch(songs.len());
        let mut results = Vec::with_capacity(songs.len());

        for song in songs {
            if cancel.is_cancelled() {
                info!(
                    resolved = results.len(),
                    remaining = songs.len() - results.len(),
                    "Resolution cancelled"
                );
                break;
            }

            let resolution = self
                .resolve_throttled(&song.title, &song.artist, Some(delay))
                .await;
            results.push((song.clone(), resolution));
        }

        results
    }

    async fn resolve_throttled(
        &self,
        title: &str,
        artist: &str,
        delay: Option<Duration>,
    ) -> Resolution {
        let key = normalized_key(title, artist);

        if let Some(video_id) = self.cache.get(&key) {
            debug!(title = %title, artist = %artist, video_id = %video_id, "Cache hit");
            return Resolution::Resolved(video_id);
        }

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let query = format!("{title} {artist}");
        let candidates = match self.api.search_music(&query, SEARCH_RESULTS).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(title = %title, artist = %artist, error = %e, "Search failed");
                return Resolution::Failed(e);
            }
        };

        match pick_candidate(&candidates) {
            Some(candidate) => {
                debug!(
                    title = %title,
                    artist = %artist,
                    video_id = %candidate.video_id,
                    channel = %candidate.channel_title,
                    "Resolved song"
                );
                self.cache.insert(key, candidate.video_id.clone());
                Resolution::Resolved(candidate.video_id.clone())
            }
            None => {
                info!(title = %title, artist = %artist, "No search results");
                Resolution::NotFound
            }
        }
    }
}

/// Pick the best candidate from a relevance-ranked result list
///
/// Prefers the first candidate whose channel title, video title, or
/// description carries an official-upload marker; falls back to the
/// top-ranked result.
fn pick_candidate(candidates: &[VideoCandidate]) -> Option<&VideoCandidate> {
    candidates
        .iter()
        .find(|c| {
            OFFICIAL_MARKERS.iter().any(|marker| {
                c.channel_title.to_lowercase().contains(marker)
                    || c.title.to_lowercase().contains(marker)
                    || c.description.to_lowercase().contains(marker)
            })
        })
        .or_else(|| candidates.first())
}
