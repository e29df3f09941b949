//! Pairwise playlist compatibility
//!
//! Both playlists are averaged over five features, compared with a weighted
//! similarity and squashed through a logistic curve centred on 0.5.
//!
//! The similarity divides the weighted dot product by the *product* of the
//! two weighted sums of squares, not by the square root of that product.
//! This is not cosine similarity: for averaged vectors with magnitude below
//! one it inflates scores. Existing scores were produced this way, so the
//! formula is kept as-is until it is deliberately revisited.

use crate::stats::mean_of;
use harmony_core::AudioFeatureVector;

/// Weights for energy, danceability, valence, acousticness, instrumentalness
pub const FEATURE_WEIGHTS: [f64; 5] = [0.25, 0.20, 0.20, 0.15, 0.20];

/// Steepness of the logistic squash
const SIGMOID_STEEPNESS: f64 = 5.0;
const SIGMOID_MIDPOINT: f64 = 0.5;

fn averaged(vectors: &[AudioFeatureVector]) -> [f64; 5] {
    [
        mean_of(vectors, |v| v.energy),
        mean_of(vectors, |v| v.danceability),
        mean_of(vectors, |v| v.valence),
        mean_of(vectors, |v| v.acousticness),
        mean_of(vectors, |v| v.instrumentalness),
    ]
}

/// Compatibility of two playlists in `[0, 100]`.
///
/// Returns 0 when either side has no audio features.
pub fn compatibility(vectors_a: &[AudioFeatureVector], vectors_b: &[AudioFeatureVector]) -> u8 {
    if vectors_a.is_empty() || vectors_b.is_empty() {
        return 0;
    }

    let a = averaged(vectors_a);
    let b = averaged(vectors_b);

    let mut weighted_dot = 0.0;
    let mut weighted_sq_a = 0.0;
    let mut weighted_sq_b = 0.0;
    for ((w, a), b) in FEATURE_WEIGHTS.iter().zip(a).zip(b) {
        weighted_dot += w * a * b;
        weighted_sq_a += w * a * a;
        weighted_sq_b += w * b * b;
    }

    let denominator = weighted_sq_a * weighted_sq_b;
    let similarity = if denominator > 0.0 {
        weighted_dot / denominator
    } else {
        0.0
    };

    let sigmoid = 1.0 / (1.0 + (-SIGMOID_STEEPNESS * (similarity - SIGMOID_MIDPOINT)).exp());
    (sigmoid * 100.0).round().clamp(0.0, 100.0) as u8
}
