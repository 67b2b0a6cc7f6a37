//! Shared test support: a recording fake of the remote video service
//!
//! Every call is counted so tests can assert that a code path performed
//! no remote calls at all.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use aura_sync::video::{PlaylistSummary, VideoApi, VideoApiError, VideoCandidate};

/// In-memory stand-in for the remote video service
#[derive(Default)]
pub struct RecordingApi {
    search_results: Mutex<HashMap<String, Vec<VideoCandidate>>>,
    failing_queries: Mutex<HashSet<String>>,
    playlists: Mutex<Vec<PlaylistSummary>>,
    playlist_items: Mutex<HashMap<String, Vec<String>>>,
    created_playlists: Mutex<Vec<(String, String)>>,
    failing_inserts: Mutex<HashSet<String>>,

    pub search_calls: AtomicUsize,
    pub list_playlist_calls: AtomicUsize,
    pub create_playlist_calls: AtomicUsize,
    pub list_item_calls: AtomicUsize,
    pub insert_calls: AtomicUsize,
}

impl RecordingApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register canned search results for an exact query
    pub fn with_search(&self, query: &str, candidates: Vec<VideoCandidate>) {
        self.search_results
            .lock()
            .unwrap()
            .insert(query.to_string(), candidates);
    }

    /// Make searches for `query` fail with a network error
    pub fn fail_search(&self, query: &str) {
        self.failing_queries.lock().unwrap().insert(query.to_string());
    }

    /// Register an existing playlist
    pub fn with_playlist(&self, id: &str, title: &str) {
        self.playlists.lock().unwrap().push(PlaylistSummary {
            id: id.to_string(),
            title: title.to_string(),
        });
        self.playlist_items
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default();
    }

    /// Register an existing playlist member
    pub fn with_member(&self, playlist_id: &str, video_id: &str) {
        self.playlist_items
            .lock()
            .unwrap()
            .entry(playlist_id.to_string())
            .or_default()
            .push(video_id.to_string());
    }

    /// Make insertions of `video_id` fail
    pub fn fail_insert(&self, video_id: &str) {
        self.failing_inserts.lock().unwrap().insert(video_id.to_string());
    }

    /// Members of a playlist as recorded by the fake
    pub fn members(&self, playlist_id: &str) -> Vec<String> {
        self.playlist_items
            .lock()
            .unwrap()
            .get(playlist_id)
            .cloned()
            .unwrap_or_default()
    }

    /// (title, description) pairs of playlists created through the fake
    pub fn created(&self) -> Vec<(String, String)> {
        self.created_playlists.lock().unwrap().clone()
    }

    /// Total remote calls across every method
    pub fn remote_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
            + self.list_playlist_calls.load(Ordering::SeqCst)
            + self.create_playlist_calls.load(Ordering::SeqCst)
            + self.list_item_calls.load(Ordering::SeqCst)
            + self.insert_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoApi for RecordingApi {
    async fn search_music(
        &self,
        query: &str,
        _max_results: u32,
    ) -> Result<Vec<VideoCandidate>, VideoApiError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_queries.lock().unwrap().contains(query) {
            return Err(VideoApiError::NetworkError("connection reset".to_string()));
        }

        Ok(self
            .search_results
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_my_playlists(
        &self,
        _page_size: u32,
    ) -> Result<Vec<PlaylistSummary>, VideoApiError> {
        self.list_playlist_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.playlists.lock().unwrap().clone())
    }

    async fn create_playlist(
        &self,
        title: &str,
        description: &str,
    ) -> Result<String, VideoApiError> {
        self.create_playlist_calls.fetch_add(1, Ordering::SeqCst);
        self.created_playlists
            .lock()
            .unwrap()
            .push((title.to_string(), description.to_string()));

        let id = format!("pl-created-{}", self.created_playlists.lock().unwrap().len());
        self.playlists.lock().unwrap().push(PlaylistSummary {
            id: id.clone(),
            title: title.to_string(),
        });
        self.playlist_items
            .lock()
            .unwrap()
            .insert(id.clone(), Vec::new());
        Ok(id)
    }

    async fn list_playlist_items(
        &self,
        playlist_id: &str,
        _page_size: u32,
    ) -> Result<Vec<String>, VideoApiError> {
        self.list_item_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.members(playlist_id))
    }

    async fn insert_playlist_item(
        &self,
        playlist_id: &str,
        video_id: &str,
    ) -> Result<(), VideoApiError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_inserts.lock().unwrap().contains(video_id) {
            return Err(VideoApiError::ApiError(409, "insert rejected".to_string()));
        }

        self.playlist_items
            .lock()
            .unwrap()
            .entry(playlist_id.to_string())
            .or_default()
            .push(video_id.to_string());
        Ok(())
    }
}

/// A candidate from an obviously official channel
pub fn official_candidate(video_id: &str, title: &str, artist: &str) -> VideoCandidate {
    VideoCandidate {
        video_id: video_id.to_string(),
        title: format!("{title} (Official Video)"),
        channel_title: format!("{artist} Official"),
        description: String::new(),
    }
}
