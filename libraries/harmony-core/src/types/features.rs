//! Per-track audio descriptors

use serde::{Deserialize, Serialize};

/// Normalized descriptor of a track's musical character.
///
/// Every field except `tempo` lies in `[0, 1]`. `tempo` is in BPM and is
/// not normalized. Vectors are immutable snapshots; a playlist is summarized
/// by the arithmetic mean of its tracks' vectors.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AudioFeatureVector {
    /// Intensity and activity
    pub energy: f64,
    /// Suitability for dancing
    pub danceability: f64,
    /// Musical positiveness
    pub valence: f64,
    /// Confidence the track is acoustic
    pub acousticness: f64,
    /// Likelihood of no vocals
    pub instrumentalness: f64,
    /// Presence of an audience
    pub liveness: f64,
    /// Presence of spoken words
    pub speechiness: f64,
    /// Beats per minute
    pub tempo: f64,
}

impl AudioFeatureVector {
    /// Component-wise arithmetic mean of `vectors`.
    ///
    /// Returns `None` for an empty slice.
    pub fn mean(vectors: &[Self]) -> Option<Self> {
        if vectors.is_empty() {
            return None;
        }

        let n = vectors.len() as f64;
        let sum = vectors.iter().fold(Self::default(), |acc, v| Self {
            energy: acc.energy + v.energy,
            danceability: acc.danceability + v.danceability,
            valence: acc.valence + v.valence,
            acousticness: acc.acousticness + v.acousticness,
            instrumentalness: acc.instrumentalness + v.instrumentalness,
            liveness: acc.liveness + v.liveness,
            speechiness: acc.speechiness + v.speechiness,
            tempo: acc.tempo + v.tempo,
        });

        Some(Self {
            energy: sum.energy / n,
            danceability: sum.danceability / n,
            valence: sum.valence / n,
            acousticness: sum.acousticness / n,
            instrumentalness: sum.instrumentalness / n,
            liveness: sum.liveness / n,
            speechiness: sum.speechiness / n,
            tempo: sum.tempo / n,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_empty_is_none() {
        assert!(AudioFeatureVector::mean(&[]).is_none());
    }

    #[test]
    fn mean_averages_every_component() {
        let a = AudioFeatureVector {
            energy: 1.0,
            danceability: 0.2,
            valence: 0.0,
            acousticness: 0.5,
            instrumentalness: 0.1,
            liveness: 0.3,
            speechiness: 0.05,
            tempo: 100.0,
        };
        let b = AudioFeatureVector {
            energy: 0.0,
            danceability: 0.4,
            valence: 1.0,
            acousticness: 0.5,
            instrumentalness: 0.3,
            liveness: 0.1,
            speechiness: 0.15,
            tempo: 140.0,
        };

        let mean = AudioFeatureVector::mean(&[a, b]).unwrap();
        assert!((mean.energy - 0.5).abs() < 1e-9);
        assert!((mean.danceability - 0.3).abs() < 1e-9);
        assert!((mean.valence - 0.5).abs() < 1e-9);
        assert!((mean.acousticness - 0.5).abs() < 1e-9);
        assert!((mean.instrumentalness - 0.2).abs() < 1e-9);
        assert!((mean.liveness - 0.2).abs() < 1e-9);
        assert!((mean.speechiness - 0.1).abs() < 1e-9);
        assert!((mean.tempo - 120.0).abs() < 1e-9);
    }

    #[test]
    fn deserializes_upstream_payload_ignoring_extra_fields() {
        let json = r#"{
            "id": "4uLU6hMCjMI75M1A2tKUQC",
            "energy": 0.7,
            "danceability": 0.6,
            "valence": 0.5,
            "acousticness": 0.1,
            "instrumentalness": 0.0,
            "liveness": 0.2,
            "speechiness": 0.04,
            "tempo": 118.2,
            "key": 5
        }"#;

        let v: AudioFeatureVector = serde_json::from_str(json).unwrap();
        assert_eq!(v.energy, 0.7);
        assert_eq!(v.tempo, 118.2);
    }
}
