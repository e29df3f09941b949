//! Listening personality classification
//!
//! Rules are checked in a fixed priority order and the first match wins.
//! A playlist that satisfies several rules is classified by the earliest
//! one, never by which threshold it exceeds by the widest margin.

use crate::stats::mean_of;
use harmony_core::{AudioFeatureVector, PersonalityType};

/// Personality classification with its description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Personality {
    pub kind: PersonalityType,
    pub description: &'static str,
}

impl From<PersonalityType> for Personality {
    fn from(kind: PersonalityType) -> Self {
        Self {
            kind,
            description: kind.description(),
        }
    }
}

/// Classify a playlist's listening personality.
///
/// `genres` is accepted so callers can pass the playlist's genre list
/// alongside its features; the current rule set only looks at features.
pub fn personality(vectors: &[AudioFeatureVector], _genres: &[String]) -> Personality {
    if vectors.is_empty() {
        return PersonalityType::Unknown.into();
    }

    let energy = mean_of(vectors, |v| v.energy);
    let valence = mean_of(vectors, |v| v.valence);
    let danceability = mean_of(vectors, |v| v.danceability);
    let acousticness = mean_of(vectors, |v| v.acousticness);
    let instrumentalness = mean_of(vectors, |v| v.instrumentalness);

    let kind = if instrumentalness > 0.3 || (energy > 0.8 && danceability < 0.4) {
        PersonalityType::Experimentalist
    } else if acousticness > 0.5 || valence < 0.3 || valence > 0.8 {
        PersonalityType::MoodDriven
    } else if energy > 0.4 && acousticness > 0.3 {
        PersonalityType::Eclectic
    } else {
        PersonalityType::TrendAware
    };

    kind.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(
        energy: f64,
        danceability: f64,
        valence: f64,
        acousticness: f64,
        instrumentalness: f64,
    ) -> AudioFeatureVector {
        AudioFeatureVector {
            energy,
            danceability,
            valence,
            acousticness,
            instrumentalness,
            ..Default::default()
        }
    }

    #[test]
    fn empty_is_unknown() {
        let p = personality(&[], &[]);
        assert_eq!(p.kind, PersonalityType::Unknown);
        assert_eq!(p.description, PersonalityType::Unknown.description());
    }

    #[test]
    fn priority_beats_magnitude() {
        // Satisfies both Experimentalist (energy/danceability) and
        // Mood-Driven (acousticness), must be Experimentalist.
        let v = vector(0.9, 0.3, 0.5, 0.6, 0.0);
        assert_eq!(personality(&[v], &[]).kind, PersonalityType::Experimentalist);
    }

    #[test]
    fn instrumental_is_experimentalist() {
        let v = vector(0.5, 0.6, 0.5, 0.1, 0.31);
        assert_eq!(personality(&[v], &[]).kind, PersonalityType::Experimentalist);
    }

    #[test]
    fn extreme_valence_is_mood_driven() {
        assert_eq!(
            personality(&[vector(0.5, 0.6, 0.2, 0.1, 0.0)], &[]).kind,
            PersonalityType::MoodDriven
        );
        assert_eq!(
            personality(&[vector(0.5, 0.6, 0.9, 0.1, 0.0)], &[]).kind,
            PersonalityType::MoodDriven
        );
    }

    #[test]
    fn energetic_acoustic_is_eclectic() {
        let v = vector(0.6, 0.6, 0.5, 0.4, 0.0);
        assert_eq!(personality(&[v], &[]).kind, PersonalityType::Eclectic);
    }

    #[test]
    fn balanced_is_trend_aware() {
        let v = vector(0.6, 0.7, 0.5, 0.1, 0.0);
        let p = personality(&[v], &["pop".to_string()]);
        assert_eq!(p.kind, PersonalityType::TrendAware);
        assert_eq!(p.description, PersonalityType::TrendAware.description());
    }

    #[test]
    fn classification_uses_averages() {
        // Individually Experimentalist and Trend-Aware, averaged instrumentalness 0.25
        let a = vector(0.6, 0.7, 0.5, 0.1, 0.5);
        let b = vector(0.6, 0.7, 0.5, 0.1, 0.0);
        assert_eq!(personality(&[a, b], &[]).kind, PersonalityType::TrendAware);
    }
}
