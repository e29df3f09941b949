//! Playlist analysis for Harmony
//!
//! This crate provides:
//! - Health scoring (flow, variety and engagement folded into 0-100)
//! - Listening personality classification
//! - Subgenre extraction and genre distribution
//! - Star rating derived from the health score
//! - Pairwise playlist compatibility
//!
//! Every function is pure: no I/O, no errors. Degenerate inputs (no tracks,
//! no features) produce defined sentinel values instead.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌────────────────────┐     ┌────────────────┐
//! │ PlaylistSnapshot │ ──► │ analyze_playlist() │ ──► │ AnalysisResult │
//! └──────────────────┘     └────────────────────┘     └────────────────┘
//!
//! ┌──────────────────┐
//! │ PlaylistSnapshot │ ──┐  ┌────────────────────┐     ┌─────────────────────┐
//! └──────────────────┘   ├► │ compare_playlists()│ ──► │ CompatibilityResult │
//! ┌──────────────────┐   │  └────────────────────┘     └─────────────────────┘
//! │ PlaylistSnapshot │ ──┘
//! └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use harmony_analysis::{health_score, rating};
//! use harmony_core::{AudioFeatureVector, HealthStatus};
//!
//! let tracks = vec![AudioFeatureVector { energy: 0.7, danceability: 0.8, ..Default::default() }; 20];
//! let health = health_score(&tracks, 20, 12);
//! assert_eq!(health.status, HealthStatus::Exceptional);
//!
//! let stars = rating(health.score, 20);
//! assert!(stars.value >= 4.5);
//! ```

#![deny(unsafe_code)]

mod compatibility;
mod genres;
mod health;
mod personality;
mod playlist;
mod rating;
mod stats;

pub use compatibility::{compatibility, FEATURE_WEIGHTS};
pub use genres::{
    genre_distribution, subgenres, DOMINANT_GENRE_COUNT, GENRE_DISTRIBUTION_LIMIT, SUBGENRE_LIMIT,
};
pub use health::{health_score, HealthScore};
pub use personality::{personality, Personality};
pub use playlist::{analyze_playlist, compare_playlists, top_tracks, PlaylistSnapshot, TOP_TRACK_LIMIT};
pub use rating::{rating, Rating};
