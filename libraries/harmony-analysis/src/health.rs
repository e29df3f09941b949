//! Playlist health scoring
//!
//! The score blends three components, each on a 0-100 scale:
//!
//! - **flow**: how smoothly energy moves between tracks. A population
//!   standard deviation of energy below 0.2 earns full marks; above that the
//!   component falls by 200 points per unit of deviation.
//! - **variety**: distinct genres per track, scaled so that one new genre
//!   every five tracks already saturates the component.
//! - **engagement**: mean danceability.
//!
//! Weighted 40/30/30 and rounded to the nearest integer.

use crate::stats::{mean_of, std_dev_of};
use harmony_core::{AudioFeatureVector, HealthStatus};

const FLOW_WEIGHT: f64 = 0.4;
const VARIETY_WEIGHT: f64 = 0.3;
const ENGAGEMENT_WEIGHT: f64 = 0.3;

/// Energy deviation below which flow is perfect
const SMOOTH_ENERGY_STD_DEV: f64 = 0.2;
const FLOW_PENALTY_PER_UNIT: f64 = 200.0;
const VARIETY_SCALE: f64 = 500.0;

/// Health score with its band
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthScore {
    /// 0-100
    pub score: u8,
    pub status: HealthStatus,
}

impl HealthScore {
    /// Sentinel for playlists without any audio features
    pub const UNKNOWN: HealthScore = HealthScore {
        score: 0,
        status: HealthStatus::Unknown,
    };
}

/// Compute the health score of a playlist.
///
/// # Arguments
/// * `vectors` - audio features of the tracks that have them
/// * `track_count` - number of tracks in the playlist
/// * `unique_genre_count` - distinct genres across the playlist's artists
///
/// An empty `vectors` slice yields [`HealthScore::UNKNOWN`].
pub fn health_score(
    vectors: &[AudioFeatureVector],
    track_count: usize,
    unique_genre_count: usize,
) -> HealthScore {
    if vectors.is_empty() {
        return HealthScore::UNKNOWN;
    }

    let energy_std_dev = std_dev_of(vectors, |v| v.energy);
    let flow = if energy_std_dev < SMOOTH_ENERGY_STD_DEV {
        100.0
    } else {
        (100.0 - (energy_std_dev - SMOOTH_ENERGY_STD_DEV) * FLOW_PENALTY_PER_UNIT).clamp(0.0, 100.0)
    };

    let variety = if track_count == 0 {
        0.0
    } else {
        (unique_genre_count as f64 / track_count as f64 * VARIETY_SCALE).clamp(0.0, 100.0)
    };

    let engagement = (mean_of(vectors, |v| v.danceability) * 100.0).clamp(0.0, 100.0);

    let raw = FLOW_WEIGHT * flow + VARIETY_WEIGHT * variety + ENGAGEMENT_WEIGHT * engagement;
    let score = raw.round().clamp(0.0, 100.0) as u8;

    HealthScore {
        score,
        status: HealthStatus::from_score(score),
    }
}
