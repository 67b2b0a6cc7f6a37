//! Playlist Reconciler
//!
//! Compares the catalog's pending songs against the remote playlist and
//! applies the minimal set of insertions to align them. Each step is
//! independently fault-tolerant: per-item failures are logged and
//! skipped, while failures before any playlist mutation surface as
//! typed errors.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogStore, SongKey};
use crate::resolver::{CandidateResolver, Resolution};
use crate::video::{VideoApi, VideoApiError};

/// Target playlist settings
#[derive(Debug, Clone)]
pub struct PlaylistConfig {
    /// Fixed playlist title, matched exactly and case-sensitively
    pub title: String,
    /// Description used when the playlist has to be created
    pub description: String,
    /// Page size for playlist listing and membership checks
    pub page_size: u32,
}

impl Default for PlaylistConfig {
    fn default() -> Self {
        Self {
            title: "Aura Listening History".to_string(),
            description: "Songs imported from my listening history".to_string(),
            page_size: 50,
        }
    }
}

/// Structured result of a reconciliation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub playlist_id: String,
    pub playlist_url: String,
    /// Songs in the request
    pub requested_count: usize,
    /// Videos newly inserted into the playlist this run
    pub added_count: usize,
    /// Songs whose catalog entry was already synchronized
    pub already_added_count: usize,
    /// Songs with no catalog entry
    pub not_found_count: usize,
}

/// Reconciliation errors
///
/// All variants are raised before any catalog entry is marked
/// synchronized.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(
        "No new songs available to add to playlist \
         ({already_added} already added, {not_found} not found in catalog)"
    )]
    NothingToAdd {
        already_added: usize,
        not_found: usize,
    },

    #[error("No videos could be resolved for the available songs")]
    NoVideosResolved,

    #[error("Playlist operation failed: {0}")]
    Playlist(#[from] VideoApiError),

    #[error("Reconciliation cancelled before any playlist change")]
    Cancelled,

    #[error(transparent)]
    Store(#[from] aura_common::Error),
}

/// Synchronizes pending catalog entries into the remote playlist
pub struct PlaylistReconciler {
    store: CatalogStore,
    api: Arc<dyn VideoApi>,
    resolver: CandidateResolver,
    config: PlaylistConfig,
}

impl PlaylistReconciler {
    pub fn new(
        store: CatalogStore,
        api: Arc<dyn VideoApi>,
        resolver: CandidateResolver,
        config: PlaylistConfig,
    ) -> Self {
        Self {
            store,
            api,
            resolver,
            config,
        }
    }

    /// Reconcile the requested songs against the remote playlist
    ///
    /// Songs are partitioned against the catalog, resolved to video ids,
    /// and inserted into the target playlist unless already members.
    /// Every available song whose video was resolved and confirmed
    /// present (inserted now or already a member) is marked
    /// synchronized; resolution and insertion failures leave the
    /// catalog untouched for that song.
    pub async fn reconcile(
        &self,
        songs: &[SongKey],
        existing_playlist_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let requested_count = songs.len();

        // Partition against the catalog
        let mut available = Vec::new();
        let mut already_added_count = 0;
        let mut not_found_count = 0;

        for song in songs {
            match self.store.get(&song.title, &song.artist).await? {
                Some(entry) if entry.added_to_playlist => already_added_count += 1,
                Some(_) => available.push(song.clone()),
                None => {
                    debug!(song = %song, "Song not in catalog");
                    not_found_count += 1;
                }
            }
        }

        if available.is_empty() {
            return Err(ReconcileError::NothingToAdd {
                already_added: already_added_count,
                not_found: not_found_count,
            });
        }

        info!(
            requested = requested_count,
            available = available.len(),
            already_added = already_added_count,
            not_found = not_found_count,
            "Partitioned songs against catalog"
        );

        // Resolve available songs to video ids; unresolved songs are
        // dropped from the insert set
        let resolutions = self.resolver.resolve_batch(&available, cancel).await;
        if cancel.is_cancelled() {
            return Err(ReconcileError::Cancelled);
        }

        let resolved: Vec<(SongKey, String)> = resolutions
            .into_iter()
            .filter_map(|(song, resolution)| match resolution {
                Resolution::Resolved(video_id) => Some((song, video_id)),
                Resolution::NotFound => {
                    info!(song = %song, "Dropping song with no search match");
                    None
                }
                Resolution::Failed(e) => {
                    warn!(song = %song, error = %e, "Dropping song after search failure");
                    None
                }
            })
            .collect();

        if resolved.is_empty() {
            return Err(ReconcileError::NoVideosResolved);
        }

        // Locate or create the target playlist
        let playlist_id = match existing_playlist_id {
            Some(id) => id.to_string(),
            None => self.find_or_create_playlist().await?,
        };

        // Membership check over one page of recent items; best-effort,
        // so very large playlists can produce duplicate inserts
        let members: HashSet<String> = self
            .api
            .list_playlist_items(&playlist_id, self.config.page_size)
            .await?
            .into_iter()
            .collect();

        let mut added_count = 0;
        let mut confirmed: Vec<SongKey> = Vec::new();

        for (song, video_id) in &resolved {
            if cancel.is_cancelled() {
                info!("Cancelled; keeping insertions already performed");
                break;
            }

            if members.contains(video_id) {
                debug!(song = %song, video_id = %video_id, "Already a playlist member");
                confirmed.push(song.clone());
                continue;
            }

            match self.api.insert_playlist_item(&playlist_id, video_id).await {
                Ok(()) => {
                    added_count += 1;
                    confirmed.push(song.clone());
                }
                Err(e) => {
                    warn!(song = %song, video_id = %video_id, error = %e, "Insertion failed, skipping");
                }
            }
        }

        // Resolved and confirmed present counts as synchronized, even
        // when the insertion was a no-op
        for song in &confirmed {
            self.store.mark_added(&song.title, &song.artist).await?;
        }

        let outcome = ReconcileOutcome {
            playlist_url: playlist_url(&playlist_id),
            playlist_id,
            requested_count,
            added_count,
            already_added_count,
            not_found_count,
        };

        info!(
            playlist = %outcome.playlist_id,
            added = outcome.added_count,
            already_added = outcome.already_added_count,
            not_found = outcome.not_found_count,
            "Reconciliation complete"
        );

        Ok(outcome)
    }

    /// Find the configured playlist by exact title, creating it if absent
    async fn find_or_create_playlist(&self) -> Result<String, ReconcileError> {
        let playlists = self.api.list_my_playlists(self.config.page_size).await?;

        if let Some(existing) = playlists.iter().find(|p| p.title == self.config.title) {
            debug!(playlist_id = %existing.id, "Found existing playlist");
            return Ok(existing.id.clone());
        }

        let id = self
            .api
            .create_playlist(&self.config.title, &self.config.description)
            .await?;
        info!(playlist_id = %id, title = %self.config.title, "Created playlist");
        Ok(id)
    }
}

/// Public URL for a playlist id
fn playlist_url(playlist_id: &str) -> String {
    format!("https://www.youtube.com/playlist?list={playlist_id}")
}
