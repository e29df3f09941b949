//! Harmony Client
//!
//! Resilient request pipeline for the Harmony backend.
//!
//! # Features
//!
//! - **Caching**: read responses cached per normalized path and query, with TTL
//! - **Authentication**: identity bearer on every call, capability token on
//!   gated endpoints, one refresh-and-resend when the backend rejects it
//! - **Single-flight refresh**: concurrent callers share one token refresh
//! - **Retry**: exponential backoff with jitter for transient failures
//! - **Cancellation**: per-request `CancellationToken`
//!
//! # Example
//!
//! ```ignore
//! use harmony_client::{HarmonyClient, PipelineConfig, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HarmonyClient::new("https://api.example.com", PipelineConfig::default())?;
//!
//!     client
//!         .sign_in(Session {
//!             identity_token: "identity".into(),
//!             capability_token: Some("capability".into()),
//!             capability_refresh_token: Some("refresh".into()),
//!             capability_expires_in: Some(3600),
//!         })
//!         .await?;
//!
//!     let tracks = client.playlist_tracks("37i9dQZF1DXcBWIGoYBM5M").await?;
//!     println!("{} tracks", tracks.len());
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
mod client;
pub mod config;
pub mod credentials;
mod error;
pub mod pipeline;
pub mod token;
pub mod transport;
mod types;

// Re-export main types
pub use cache::{cache_key, CacheStore};
pub use client::{HarmonyClient, AUDIO_FEATURES_BATCH};
pub use config::{AuthSettings, CacheSettings, PipelineConfig, RetrySettings};
pub use credentials::{CredentialKey, CredentialStore, MemoryCredentialStore};
pub use error::{ErrorCategory, ErrorCode, ErrorEnvelope, PipelineError, Result, TokenError};
pub use pipeline::{
    ErrorAction, RequestContext, RequestPipeline, RequestPipelineBuilder, Stage,
    CAPABILITY_HEADER,
};
pub use token::{
    BackendTokenRefresher, RefreshState, TokenGrant, TokenRefreshCoordinator, TokenRefresher,
};
pub use transport::{HttpTransport, ReqwestTransport};
pub use types::{
    ApiRequest, ApiResponse, ArtistGenres, Page, PlaylistPage, RefreshTokenRequest,
    RefreshTokenResponse, ServerInfo, Session, UserProfile,
};
