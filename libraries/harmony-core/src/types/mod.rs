//! Domain types for playlist analysis

mod analysis;
mod features;
mod playlist;

pub use analysis::{AnalysisResult, CompatibilityResult, GenreShare, HealthStatus, PersonalityType};
pub use features::AudioFeatureVector;
pub use playlist::{PlaylistRef, TrackSummary};
