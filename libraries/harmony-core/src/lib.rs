//! Harmony Core
//!
//! Platform-agnostic domain types for playlist analysis.
//!
//! This crate provides the data model exchanged between the request pipeline
//! (`harmony-client`), the analysis engine (`harmony-analysis`) and whatever
//! presentation or persistence layer consumes the results.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Audio descriptors**: `AudioFeatureVector`, one per track
//! - **Playlist identity**: `PlaylistRef`, `TrackSummary`
//! - **Analysis outputs**: `AnalysisResult`, `CompatibilityResult`
//!
//! # Example
//!
//! ```rust
//! use harmony_core::AudioFeatureVector;
//!
//! let a = AudioFeatureVector { energy: 0.8, ..AudioFeatureVector::default() };
//! let b = AudioFeatureVector { energy: 0.4, ..AudioFeatureVector::default() };
//!
//! let mean = AudioFeatureVector::mean(&[a, b]).unwrap();
//! assert!((mean.energy - 0.6).abs() < 1e-9);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod types;

pub use types::{
    AnalysisResult, AudioFeatureVector, CompatibilityResult, GenreShare, HealthStatus,
    PersonalityType, PlaylistRef, TrackSummary,
};
