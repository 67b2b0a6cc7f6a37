//! Remote video service interface
//!
//! The reconciliation core talks to the remote service exclusively
//! through the [`VideoApi`] trait, so tests can substitute a recording
//! fake and the production transport stays swappable. The shipped
//! implementation is [`youtube::YouTubeClient`].

pub mod youtube;

pub use youtube::YouTubeClient;

use async_trait::async_trait;
use thiserror::Error;

/// Remote call errors
#[derive(Debug, Error)]
pub enum VideoApiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Unauthorized: access token rejected")]
    Unauthorized,

    #[error("Quota exceeded or access forbidden")]
    QuotaExceeded,

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// One ranked search result
#[derive(Debug, Clone, PartialEq)]
pub struct VideoCandidate {
    pub video_id: String,
    pub title: String,
    pub channel_title: String,
    pub description: String,
}

/// One playlist owned by the authenticated account
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistSummary {
    pub id: String,
    pub title: String,
}

/// Capability interface over the remote video-sharing service
///
/// All calls are synchronous request/response; pagination beyond the
/// first page is deliberately not exposed (membership checks are
/// best-effort over a bounded page of recent items).
#[async_trait]
pub trait VideoApi: Send + Sync {
    /// Search for music videos, best matches first
    async fn search_music(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<VideoCandidate>, VideoApiError>;

    /// List playlists owned by the authenticated account (one page)
    async fn list_my_playlists(
        &self,
        page_size: u32,
    ) -> Result<Vec<PlaylistSummary>, VideoApiError>;

    /// Create a private playlist, returning its id
    async fn create_playlist(
        &self,
        title: &str,
        description: &str,
    ) -> Result<String, VideoApiError>;

    /// List video ids currently in a playlist (one page of recent items)
    async fn list_playlist_items(
        &self,
        playlist_id: &str,
        page_size: u32,
    ) -> Result<Vec<String>, VideoApiError>;

    /// Append a video to a playlist
    async fn insert_playlist_item(
        &self,
        playlist_id: &str,
        video_id: &str,
    ) -> Result<(), VideoApiError>;
}
