//! Playlist service: fetches through the client, analyzes with the engine.

use crate::error::Result;
use harmony_analysis::{analyze_playlist, compare_playlists, PlaylistSnapshot};
use harmony_client::{HarmonyClient, PlaylistPage};
use harmony_core::{AnalysisResult, CompatibilityResult};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

/// Most artist names sent in one genre lookup.
pub const ARTIST_BATCH: usize = 50;

pub struct PlaylistService {
    client: HarmonyClient,
}

impl PlaylistService {
    pub fn new(client: HarmonyClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &HarmonyClient {
        &self.client
    }

    /// Gather everything the analysis engine needs for one playlist.
    pub async fn snapshot(&self, playlist_id: &str) -> Result<PlaylistSnapshot> {
        let (playlist, tracks) = tokio::try_join!(
            self.client.playlist(playlist_id),
            self.client.playlist_tracks(playlist_id)
        )?;

        let track_ids: Vec<String> = tracks.iter().map(|t| t.id.clone()).collect();
        let features = self.client.audio_features(&track_ids).await?;

        let artist_names: Vec<String> = tracks
            .iter()
            .flat_map(|t| t.artists.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut artist_genres = HashMap::with_capacity(artist_names.len());
        for batch in artist_names.chunks(ARTIST_BATCH) {
            for artist in self.client.artists(batch).await? {
                artist_genres.insert(artist.name, artist.genres);
            }
        }

        debug!(
            playlist = %playlist.id,
            tracks = tracks.len(),
            features = features.len(),
            artists = artist_genres.len(),
            "Fetched playlist snapshot"
        );

        Ok(PlaylistSnapshot {
            playlist,
            tracks,
            features,
            artist_genres,
        })
    }

    pub async fn analyze(&self, playlist_id: &str) -> Result<AnalysisResult> {
        let snapshot = self.snapshot(playlist_id).await?;
        let result = analyze_playlist(&snapshot);
        info!(
            playlist = %result.playlist.id,
            health_score = result.health_score,
            personality = result.personality_type.label(),
            "Analyzed playlist"
        );
        Ok(result)
    }

    pub async fn compare(&self, a: &str, b: &str) -> Result<CompatibilityResult> {
        let (snapshot_a, snapshot_b) = tokio::try_join!(self.snapshot(a), self.snapshot(b))?;
        let result = compare_playlists(&snapshot_a, &snapshot_b);
        info!(a = %a, b = %b, score = result.score, "Compared playlists");
        Ok(result)
    }

    pub async fn playlists(&self, limit: u32, offset: u32) -> Result<PlaylistPage> {
        Ok(self.client.playlists(limit, offset).await?)
    }
}
