//! Analysis output types
//!
//! These are produced by `harmony-analysis` and handed to presentation or
//! persistence collaborators. They are computed once and never mutated.

use super::features::AudioFeatureVector;
use super::playlist::{PlaylistRef, TrackSummary};
use serde::{Deserialize, Serialize};

/// Health band derived from a 0-100 health score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Score 90 and above
    Exceptional,
    /// Score 75 to 89
    Great,
    /// Score 60 to 74
    Good,
    /// Score 40 to 59
    Average,
    /// Score below 40
    NeedsWork,
    /// No audio features were available
    Unknown,
}

impl HealthStatus {
    /// Map a health score onto its band.
    ///
    /// Bands: `>= 90` Exceptional, `>= 75` Great, `>= 60` Good,
    /// `>= 40` Average, anything lower Needs Work.
    pub fn from_score(score: u8) -> Self {
        match score {
            90.. => HealthStatus::Exceptional,
            75..=89 => HealthStatus::Great,
            60..=74 => HealthStatus::Good,
            40..=59 => HealthStatus::Average,
            _ => HealthStatus::NeedsWork,
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            HealthStatus::Exceptional => "Exceptional",
            HealthStatus::Great => "Great",
            HealthStatus::Good => "Good",
            HealthStatus::Average => "Average",
            HealthStatus::NeedsWork => "Needs Work",
            HealthStatus::Unknown => "Unknown",
        }
    }
}

/// Listening personality inferred from a playlist's averaged features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonalityType {
    /// Instrumental, or high energy with little danceability
    Experimentalist,
    /// Acoustic, or emotionally extreme in valence
    MoodDriven,
    /// Energetic tracks mixed with acoustic textures
    Eclectic,
    /// Everything else
    TrendAware,
    /// No audio features were available
    Unknown,
}

impl PersonalityType {
    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            PersonalityType::Experimentalist => "Experimentalist",
            PersonalityType::MoodDriven => "Mood-Driven",
            PersonalityType::Eclectic => "Eclectic",
            PersonalityType::TrendAware => "Trend-Aware",
            PersonalityType::Unknown => "Unknown",
        }
    }

    /// Fixed description shown alongside the label
    pub fn description(&self) -> &'static str {
        match self {
            PersonalityType::Experimentalist => {
                "You gravitate towards the unusual: instrumental passages, \
                 restless energy and sounds most playlists leave out."
            }
            PersonalityType::MoodDriven => {
                "Your music follows your feelings, leaning into acoustic warmth \
                 or emotional extremes."
            }
            PersonalityType::Eclectic => {
                "You mix high-energy tracks with organic, acoustic textures and \
                 refuse to stay in one lane."
            }
            PersonalityType::TrendAware => {
                "You keep a finger on the pulse with balanced, polished and \
                 current-sounding picks."
            }
            PersonalityType::Unknown => "Not enough audio data to describe this playlist.",
        }
    }
}

/// One slice of a genre distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreShare {
    /// Genre name
    pub name: String,
    /// Percentage of genre mentions (0-100)
    pub value: f64,
}

/// Full analysis of a single playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Playlist that was analyzed
    pub playlist: PlaylistRef,
    /// Number of tracks in the playlist
    pub track_count: usize,
    /// Mean of the playlist's audio feature vectors, `None` if none were known
    pub audio_features: Option<AudioFeatureVector>,
    /// Composite flow, variety and engagement score (0-100)
    pub health_score: u8,
    /// Band of `health_score`
    pub health_status: HealthStatus,
    /// Inferred listening personality
    pub personality_type: PersonalityType,
    /// Description matching `personality_type`
    pub personality_description: String,
    /// Most frequent genres as percentages of all genre mentions
    pub genre_distribution: Vec<GenreShare>,
    /// Genres ranked just below the dominant ones
    pub subgenres: Vec<String>,
    /// Star rating in `[1.0, 5.0]`, one decimal
    pub overall_rating: f64,
    /// Text matching `overall_rating`
    pub rating_description: String,
    /// Most popular tracks, highest first
    pub top_tracks: Vec<TrackSummary>,
}

/// Pairwise comparison of two playlists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityResult {
    /// First playlist
    pub playlist_a: PlaylistRef,
    /// Second playlist
    pub playlist_b: PlaylistRef,
    /// Compatibility in `[0, 100]`
    pub score: u8,
    /// Playlist with the higher health score, `None` on a tie
    pub winner: Option<PlaylistRef>,
    /// Artists on both playlists, sorted
    pub shared_artists: Vec<String>,
    /// Genres found on both playlists, sorted
    pub shared_genres: Vec<String>,
    /// Tracks present on both playlists, matched by id
    pub shared_tracks: Vec<TrackSummary>,
    /// Mean features of the first playlist
    pub audio_features_a: Option<AudioFeatureVector>,
    /// Mean features of the second playlist
    pub audio_features_b: Option<AudioFeatureVector>,
}
