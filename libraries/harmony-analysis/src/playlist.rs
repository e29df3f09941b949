//! Playlist-level assembly of the individual scorers

use crate::compatibility::compatibility;
use crate::genres::{genre_distribution, subgenres, GENRE_DISTRIBUTION_LIMIT};
use crate::health::health_score;
use crate::personality::personality;
use crate::rating::rating;
use harmony_core::{AnalysisResult, AudioFeatureVector, CompatibilityResult, PlaylistRef, TrackSummary};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Number of tracks reported in `AnalysisResult::top_tracks`
pub const TOP_TRACK_LIMIT: usize = 5;

/// Everything the engine needs to know about one playlist.
///
/// Callers assemble this from whatever they fetched; the engine never
/// fetches anything itself.
#[derive(Debug, Clone, Default)]
pub struct PlaylistSnapshot {
    pub playlist: PlaylistRef,
    pub tracks: Vec<TrackSummary>,
    /// Audio features of the tracks that have them (may be shorter than `tracks`)
    pub features: Vec<AudioFeatureVector>,
    /// Genres per artist name
    pub artist_genres: HashMap<String, Vec<String>>,
}

impl PlaylistSnapshot {
    /// Count genre mentions over every artist credit in the playlist.
    ///
    /// An artist credited on three tracks contributes its genres three times.
    pub fn genre_counts(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for track in &self.tracks {
            for artist in &track.artists {
                if let Some(genres) = self.artist_genres.get(artist) {
                    for genre in genres {
                        *counts.entry(genre.clone()).or_insert(0) += 1;
                    }
                }
            }
        }
        counts
    }
}

/// Most popular tracks first; ties keep playlist order.
pub fn top_tracks(tracks: &[TrackSummary], limit: usize) -> Vec<TrackSummary> {
    let mut sorted: Vec<&TrackSummary> = tracks.iter().collect();
    sorted.sort_by(|a, b| b.popularity.cmp(&a.popularity));
    sorted.into_iter().take(limit).cloned().collect()
}

/// Run every scorer over a playlist snapshot.
pub fn analyze_playlist(snapshot: &PlaylistSnapshot) -> AnalysisResult {
    let track_count = snapshot.tracks.len();
    let genre_counts = snapshot.genre_counts();
    let genres: Vec<String> = genre_counts.keys().cloned().collect();

    let health = health_score(&snapshot.features, track_count, genre_counts.len());
    let personality = personality(&snapshot.features, &genres);
    let rating = rating(health.score, track_count);

    debug!(
        playlist_id = %snapshot.playlist.id,
        track_count,
        with_features = snapshot.features.len(),
        unique_genres = genre_counts.len(),
        health_score = health.score,
        personality = personality.kind.label(),
        "Analyzed playlist"
    );

    AnalysisResult {
        playlist: snapshot.playlist.clone(),
        track_count,
        audio_features: AudioFeatureVector::mean(&snapshot.features),
        health_score: health.score,
        health_status: health.status,
        personality_type: personality.kind,
        personality_description: personality.description.to_string(),
        genre_distribution: genre_distribution(&genre_counts, GENRE_DISTRIBUTION_LIMIT),
        subgenres: subgenres(&genre_counts),
        overall_rating: rating.value,
        rating_description: rating.description.to_string(),
        top_tracks: top_tracks(&snapshot.tracks, TOP_TRACK_LIMIT),
    }
}

/// Compare two playlist snapshots.
///
/// The winner is the playlist with the higher health score; equal scores
/// have no winner.
pub fn compare_playlists(a: &PlaylistSnapshot, b: &PlaylistSnapshot) -> CompatibilityResult {
    let score = compatibility(&a.features, &b.features);

    let genres_a = a.genre_counts();
    let genres_b = b.genre_counts();
    let health_a = health_score(&a.features, a.tracks.len(), genres_a.len());
    let health_b = health_score(&b.features, b.tracks.len(), genres_b.len());

    let winner = match health_a.score.cmp(&health_b.score) {
        std::cmp::Ordering::Greater => Some(a.playlist.clone()),
        std::cmp::Ordering::Less => Some(b.playlist.clone()),
        std::cmp::Ordering::Equal => None,
    };

    let mut shared_genres: Vec<String> = genres_a
        .keys()
        .filter(|genre| genres_b.contains_key(*genre))
        .cloned()
        .collect();
    shared_genres.sort();

    let track_ids_b: HashSet<&str> = b.tracks.iter().map(|t| t.id.as_str()).collect();
    let mut seen = HashSet::new();
    let shared_tracks: Vec<TrackSummary> = a
        .tracks
        .iter()
        .filter(|t| track_ids_b.contains(t.id.as_str()) && seen.insert(t.id.as_str()))
        .cloned()
        .collect();

    debug!(
        playlist_a = %a.playlist.id,
        playlist_b = %b.playlist.id,
        score,
        shared_tracks = shared_tracks.len(),
        "Compared playlists"
    );

    CompatibilityResult {
        playlist_a: a.playlist.clone(),
        playlist_b: b.playlist.clone(),
        score,
        winner,
        shared_artists: shared_artists(&a.tracks, &b.tracks),
        shared_genres,
        shared_tracks,
        audio_features_a: AudioFeatureVector::mean(&a.features),
        audio_features_b: AudioFeatureVector::mean(&b.features),
    }
}

/// Artists credited in both playlists, matched case-insensitively.
///
/// Keeps the first spelling seen in `a`; sorted by that spelling.
fn shared_artists(a: &[TrackSummary], b: &[TrackSummary]) -> Vec<String> {
    let artists_b: HashSet<String> = b
        .iter()
        .flat_map(|t| t.artists.iter())
        .map(|name| name.to_lowercase())
        .collect();

    let mut shared: BTreeMap<String, String> = BTreeMap::new();
    for name in a.iter().flat_map(|t| t.artists.iter()) {
        let key = name.to_lowercase();
        if artists_b.contains(&key) {
            shared.entry(key).or_insert_with(|| name.clone());
        }
    }

    let mut names: Vec<String> = shared.into_values().collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use harmony_core::{HealthStatus, PersonalityType};

    fn track(id: &str, artist: &str, popularity: u8) -> TrackSummary {
        TrackSummary::new(id, format!("Track {id}"), vec![artist.to_string()], popularity)
    }

    fn features(energy: f64, danceability: f64) -> AudioFeatureVector {
        AudioFeatureVector {
            energy,
            danceability,
            valence: 0.5,
            acousticness: 0.1,
            instrumentalness: 0.0,
            liveness: 0.1,
            speechiness: 0.05,
            tempo: 120.0,
        }
    }

    #[test]
    fn empty_snapshot_uses_sentinels() {
        let snapshot = PlaylistSnapshot {
            playlist: PlaylistRef::new("p0", "Empty"),
            ..Default::default()
        };

        let result = analyze_playlist(&snapshot);
        assert_eq!(result.track_count, 0);
        assert_eq!(result.health_score, 0);
        assert_eq!(result.health_status, HealthStatus::Unknown);
        assert_eq!(result.personality_type, PersonalityType::Unknown);
        assert!(result.audio_features.is_none());
        assert!(result.genre_distribution.is_empty());
        assert!(result.subgenres.is_empty());
        assert_eq!(result.overall_rating, 1.0);
        assert!(result.top_tracks.is_empty());
    }

    #[test]
    fn genre_counts_follow_artist_credits() {
        let snapshot = PlaylistSnapshot {
            tracks: vec![track("1", "A", 0), track("2", "A", 0), track("3", "B", 0)],
            artist_genres: HashMap::from([
                ("A".to_string(), vec!["pop".to_string(), "dance".to_string()]),
                ("B".to_string(), vec!["pop".to_string()]),
            ]),
            ..Default::default()
        };

        let counts = snapshot.genre_counts();
        assert_eq!(counts["pop"], 3);
        assert_eq!(counts["dance"], 2);
    }

    #[test]
    fn top_tracks_are_most_popular_first() {
        let tracks = vec![
            track("1", "A", 10),
            track("2", "A", 90),
            track("3", "A", 50),
            track("4", "A", 90),
        ];
        let top = top_tracks(&tracks, 3);
        let ids: Vec<&str> = top.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "4", "3"]);
    }

    #[test]
    fn comparison_reports_shared_content_and_winner() {
        let a = PlaylistSnapshot {
            playlist: PlaylistRef::new("a", "Morning"),
            tracks: vec![track("1", "Daft Punk", 80), track("2", "Air", 60)],
            features: vec![features(0.6, 0.9), features(0.6, 0.9)],
            artist_genres: HashMap::from([("Daft Punk".to_string(), vec!["french house".to_string()])]),
        };
        let b = PlaylistSnapshot {
            playlist: PlaylistRef::new("b", "Evening"),
            tracks: vec![track("1", "daft punk", 80), track("3", "Moby", 40)],
            features: vec![features(0.6, 0.2), features(0.6, 0.2)],
            artist_genres: HashMap::from([("daft punk".to_string(), vec!["french house".to_string()])]),
        };

        let result = compare_playlists(&a, &b);
        assert_eq!(result.shared_artists, vec!["Daft Punk"]);
        assert_eq!(result.shared_genres, vec!["french house"]);
        assert_eq!(result.shared_tracks.len(), 1);
        assert_eq!(result.shared_tracks[0].id, "1");
        assert_eq!(result.winner.as_ref().map(|p| p.id.as_str()), Some("a"));
        assert_eq!(result.score, compatibility(&a.features, &b.features));
        assert!(result.audio_features_a.is_some());
    }

    #[test]
    fn equal_health_has_no_winner() {
        let snapshot = PlaylistSnapshot {
            playlist: PlaylistRef::new("same", "Same"),
            tracks: vec![track("1", "A", 1)],
            features: vec![features(0.5, 0.5)],
            ..Default::default()
        };
        let result = compare_playlists(&snapshot, &snapshot.clone());
        assert!(result.winner.is_none());
    }
}
