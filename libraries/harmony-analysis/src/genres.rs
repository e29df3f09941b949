//! Genre ranking: distribution and subgenre extraction

use crate::stats::round1;
use harmony_core::GenreShare;
use std::collections::HashMap;

/// Number of leading genres treated as a playlist's dominant genres.
///
/// Subgenres are whatever ranks directly below these. The value is a fixed
/// heuristic with no deeper derivation; change it here rather than in the
/// callers.
pub const DOMINANT_GENRE_COUNT: usize = 3;

/// Maximum number of subgenres returned
pub const SUBGENRE_LIMIT: usize = 6;

/// Default number of slices in a genre distribution
pub const GENRE_DISTRIBUTION_LIMIT: usize = 5;

/// Genres sorted by count descending, ties by name ascending.
fn ranked(genre_counts: &HashMap<String, usize>) -> Vec<(&str, usize)> {
    let mut ranked: Vec<(&str, usize)> = genre_counts
        .iter()
        .map(|(name, &count)| (name.as_str(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
}

/// Genres ranked just below the dominant ones.
///
/// Skips the top [`DOMINANT_GENRE_COUNT`] genres and returns up to
/// [`SUBGENRE_LIMIT`] of the rest. Maps with three or fewer entries have no
/// subgenres.
pub fn subgenres(genre_counts: &HashMap<String, usize>) -> Vec<String> {
    if genre_counts.len() <= DOMINANT_GENRE_COUNT {
        return Vec::new();
    }

    ranked(genre_counts)
        .into_iter()
        .skip(DOMINANT_GENRE_COUNT)
        .take(SUBGENRE_LIMIT)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Share of each genre among all genre mentions, largest first.
///
/// Values are percentages rounded to one decimal. At most `limit` slices
/// are returned; an empty map yields an empty distribution.
pub fn genre_distribution(genre_counts: &HashMap<String, usize>, limit: usize) -> Vec<GenreShare> {
    let total: usize = genre_counts.values().sum();
    if total == 0 {
        return Vec::new();
    }

    ranked(genre_counts)
        .into_iter()
        .take(limit)
        .map(|(name, count)| GenreShare {
            name: name.to_string(),
            value: round1(count as f64 / total as f64 * 100.0),
        })
        .collect()
}
