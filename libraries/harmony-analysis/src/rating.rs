//! Star rating derived from the health score

use crate::stats::round1;

/// Very short playlists are rated a little lower
const SHORT_PLAYLIST_TRACKS: usize = 10;
const SHORT_PLAYLIST_FACTOR: f64 = 0.9;

/// Very long playlists are rated a little lower too
const LONG_PLAYLIST_TRACKS: usize = 500;
const LONG_PLAYLIST_FACTOR: f64 = 0.95;

const MIN_RATING: f64 = 1.0;
const MAX_RATING: f64 = 5.0;

/// Star rating with its description
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rating {
    /// `[1.0, 5.0]`, one decimal
    pub value: f64,
    pub description: &'static str,
}

/// Rate a playlist from its health score and length.
pub fn rating(health_score: u8, track_count: usize) -> Rating {
    let mut value = f64::from(health_score) / 20.0;

    if track_count < SHORT_PLAYLIST_TRACKS {
        value *= SHORT_PLAYLIST_FACTOR;
    } else if track_count > LONG_PLAYLIST_TRACKS {
        value *= LONG_PLAYLIST_FACTOR;
    }

    let value = round1(value.clamp(MIN_RATING, MAX_RATING));

    Rating {
        value,
        description: describe(value),
    }
}

fn describe(value: f64) -> &'static str {
    if value >= 4.8 {
        "Masterpiece"
    } else if value >= 4.5 {
        "Excellent"
    } else if value >= 4.0 {
        "Very Good"
    } else if value >= 3.0 {
        "Good"
    } else {
        "Needs Improvement"
    }
}
