//! YouTube Data API v3 client
//!
//! Authenticates with a caller-supplied OAuth bearer token and keeps a
//! minimum interval between outbound requests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;

use super::{PlaylistSummary, VideoApi, VideoApiError, VideoCandidate};

const YOUTUBE_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
const USER_AGENT: &str = "aura/0.1.0 (https://github.com/aura-sync/aura)";
const RATE_LIMIT_MS: u64 = 100;

/// YouTube search category id for Music
const MUSIC_CATEGORY_ID: &str = "10";

/// Rate limiter enforcing a minimum interval between requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if necessary to comply with the rate limit
    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// YouTube Data API client
pub struct YouTubeClient {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    access_token: String,
}

impl YouTubeClient {
    pub fn new(access_token: String) -> Result<Self, VideoApiError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| VideoApiError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(RATE_LIMIT_MS)),
            access_token,
        })
    }

    /// Map a non-success HTTP status to a typed error
    async fn error_for(response: reqwest::Response) -> VideoApiError {
        let status = response.status().as_u16();
        match status {
            401 => VideoApiError::Unauthorized,
            403 => VideoApiError::QuotaExceeded,
            _ => {
                let body = response.text().await.unwrap_or_default();
                VideoApiError::ApiError(status, body)
            }
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, VideoApiError> {
        self.rate_limiter.wait().await;

        let url = format!("{YOUTUBE_BASE_URL}/{path}");
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| VideoApiError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| VideoApiError::ParseError(e.to_string()))
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<T, VideoApiError> {
        self.rate_limiter.wait().await;

        let url = format!("{YOUTUBE_BASE_URL}/{path}");
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .query(query)
            .json(body)
            .send()
            .await
            .map_err(|e| VideoApiError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| VideoApiError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl VideoApi for YouTubeClient {
    async fn search_music(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<VideoCandidate>, VideoApiError> {
        tracing::debug!(query = %query, "Searching YouTube");

        let max = max_results.to_string();
        let response: SearchListResponse = self
            .get_json(
                "search",
                &[
                    ("part", "snippet"),
                    ("type", "video"),
                    ("videoCategoryId", MUSIC_CATEGORY_ID),
                    ("maxResults", &max),
                    ("q", query),
                ],
            )
            .await?;

        Ok(response
            .items
            .into_iter()
            .filter_map(|item| {
                let video_id = item.id.video_id?;
                let snippet = item.snippet?;
                Some(VideoCandidate {
                    video_id,
                    title: snippet.title,
                    channel_title: snippet.channel_title,
                    description: snippet.description,
                })
            })
            .collect())
    }

    async fn list_my_playlists(
        &self,
        page_size: u32,
    ) -> Result<Vec<PlaylistSummary>, VideoApiError> {
        let max = page_size.to_string();
        let response: PlaylistListResponse = self
            .get_json(
                "playlists",
                &[("part", "snippet"), ("mine", "true"), ("maxResults", &max)],
            )
            .await?;

        Ok(response
            .items
            .into_iter()
            .filter_map(|item| {
                let snippet = item.snippet?;
                Some(PlaylistSummary {
                    id: item.id,
                    title: snippet.title,
                })
            })
            .collect())
    }

    async fn create_playlist(
        &self,
        title: &str,
        description: &str,
    ) -> Result<String, VideoApiError> {
        tracing::info!(title = %title, "Creating playlist");

        let body = json!({
            "snippet": {
                "title": title,
                "description": description,
            },
            "status": {
                "privacyStatus": "private",
            }
        });

        let response: CreatedResource = self
            .post_json("playlists", &[("part", "snippet,status")], &body)
            .await?;

        Ok(response.id)
    }

    async fn list_playlist_items(
        &self,
        playlist_id: &str,
        page_size: u32,
    ) -> Result<Vec<String>, VideoApiError> {
        let max = page_size.to_string();
        let response: PlaylistItemListResponse = self
            .get_json(
                "playlistItems",
                &[
                    ("part", "contentDetails"),
                    ("playlistId", playlist_id),
                    ("maxResults", &max),
                ],
            )
            .await?;

        Ok(response
            .items
            .into_iter()
            .map(|item| item.content_details.video_id)
            .collect())
    }

    async fn insert_playlist_item(
        &self,
        playlist_id: &str,
        video_id: &str,
    ) -> Result<(), VideoApiError> {
        tracing::debug!(playlist_id = %playlist_id, video_id = %video_id, "Inserting playlist item");

        let body = json!({
            "snippet": {
                "playlistId": playlist_id,
                "resourceId": {
                    "kind": "youtube#video",
                    "videoId": video_id,
                }
            }
        });

        let _: CreatedResource = self
            .post_json("playlistItems", &[("part", "snippet")], &body)
            .await?;

        Ok(())
    }
}

// Wire formats (only the fields the service reads)

#[derive(Debug, Deserialize)]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(rename = "channelTitle", default)]
    channel_title: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistListResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    id: String,
    snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemListResponse {
    #[serde(default)]
    items: Vec<PlaylistItemEntry>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemEntry {
    #[serde(rename = "contentDetails")]
    content_details: ContentDetails,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    #[serde(rename = "videoId")]
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct CreatedResource {
    id: String,
}
