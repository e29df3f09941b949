//! Harmony CLI Library
//!
//! Composes the request pipeline and the analysis engine: loads
//! configuration, fetches playlists through `harmony-client` and runs
//! `harmony-analysis` over them.
//!
//! This library exposes the core components for testing purposes.

pub mod config;
pub mod error;
pub mod service;

pub use config::AppConfig;
pub use error::{CliError, Result};
pub use service::PlaylistService;
