//! Typed Harmony backend client.

use crate::cache::{normalize_path, CacheStore};
use crate::config::PipelineConfig;
use crate::credentials::{CredentialKey, CredentialStore, MemoryCredentialStore};
use crate::error::{PipelineError, Result};
use crate::pipeline::RequestPipeline;
use crate::token::{capped_lifetime, BackendTokenRefresher, TokenRefreshCoordinator};
use crate::transport::ReqwestTransport;
use crate::types::{
    ApiRequest, ArtistGenres, ArtistsResponse, AudioFeaturesResponse, PlaylistPage, ServerInfo,
    Session, TracksResponse, UserProfile,
};
use chrono::Utc;
use harmony_core::{AudioFeatureVector, PlaylistRef, TrackSummary};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Most ids the backend accepts in one audio-features call.
pub const AUDIO_FEATURES_BATCH: usize = 100;

/// Client for the Harmony backend.
///
/// Every call goes through the [`RequestPipeline`], so reads are cached,
/// credentials attached and transient failures retried without the caller
/// doing anything.
///
/// # Example
///
/// ```ignore
/// use harmony_client::{HarmonyClient, PipelineConfig, Session};
///
/// let client = HarmonyClient::new("https://api.example.com", PipelineConfig::default())?;
/// client
///     .sign_in(Session {
///         identity_token: "id".into(),
///         capability_refresh_token: Some("refresh".into()),
///         ..Default::default()
///     })
///     .await?;
///
/// let page = client.playlists(20, 0).await?;
/// for playlist in page.items {
///     println!("{}", playlist.name);
/// }
/// ```
pub struct HarmonyClient {
    pipeline: RequestPipeline,
}

impl HarmonyClient {
    /// Create a client with an in-memory credential store.
    pub fn new(base_url: &str, config: PipelineConfig) -> Result<Self> {
        Self::with_credential_store(base_url, config, Arc::new(MemoryCredentialStore::new()))
    }

    /// Create a client backed by a platform credential store.
    pub fn with_credential_store(
        base_url: &str,
        config: PipelineConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self> {
        let transport = ReqwestTransport::new(base_url, config.timeout())?;

        let refresher = BackendTokenRefresher::new(
            transport.http().clone(),
            transport.base_url(),
            &config.auth.refresh_path,
            Arc::clone(&credentials),
            config.timeout(),
        );
        let tokens = Arc::new(
            TokenRefreshCoordinator::new(Arc::new(refresher), config.auth.token_expiry_buffer())
                .with_credential_store(Arc::clone(&credentials)),
        );

        debug!(url = %transport.base_url(), "Creating Harmony client");

        let pipeline = RequestPipeline::builder(config.clone())
            .transport(Arc::new(transport))
            .cache_store(Arc::new(CacheStore::new(config.cache.capacity)))
            .credentials(credentials)
            .token_coordinator(tokens)
            .build()?;

        Ok(Self { pipeline })
    }

    /// Wrap an already assembled pipeline.
    pub fn from_pipeline(pipeline: RequestPipeline) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &RequestPipeline {
        &self.pipeline
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Store the credentials of a freshly signed-in user.
    ///
    /// Replaces whatever the previous session left behind.
    pub async fn sign_in(&self, session: Session) -> Result<()> {
        let credentials = self.pipeline.credentials();
        if let Some(tokens) = self.pipeline.tokens() {
            tokens.clear().await;
        }
        credentials.clear().await?;
        // Cache keys carry no identity
        self.pipeline.cache().clear();

        credentials
            .set(CredentialKey::IdentityToken, session.identity_token)
            .await?;
        if let Some(token) = session.capability_token {
            credentials
                .set(CredentialKey::CapabilityAccessToken, token)
                .await?;
        }
        if let Some(refresh) = session.capability_refresh_token {
            credentials
                .set(CredentialKey::CapabilityRefreshToken, refresh)
                .await?;
        }
        let expires_at = session
            .capability_expires_in
            .map(|secs| capped_lifetime(Duration::from_secs(secs)))
            .and_then(|lifetime| chrono::Duration::from_std(lifetime).ok())
            .and_then(|d| Utc::now().checked_add_signed(d));
        if let Some(expires_at) = expires_at {
            credentials
                .set(CredentialKey::CapabilityExpiresAt, expires_at.to_rfc3339())
                .await?;
        }

        self.restore_session().await;
        info!("Signed in");
        Ok(())
    }

    /// Load capability tokens persisted by an earlier session.
    ///
    /// Returns whether a capability token was found.
    pub async fn restore_session(&self) -> bool {
        match self.pipeline.tokens() {
            Some(tokens) => tokens.restore().await,
            None => false,
        }
    }

    /// Forget every credential, the token state and all cached responses.
    pub async fn sign_out(&self) -> Result<()> {
        self.pipeline.credentials().clear().await?;
        if let Some(tokens) = self.pipeline.tokens() {
            tokens.clear().await;
        }
        self.pipeline.cache().clear();
        info!("Signed out");
        Ok(())
    }

    /// Drop cached responses for `path` and everything below it.
    pub fn invalidate(&self, path: &str) -> usize {
        let removed = self.pipeline.cache().remove_matching(&normalize_path(path));
        debug!(path = %path, removed, "Invalidated cached responses");
        removed
    }

    // =========================================================================
    // Endpoints
    // =========================================================================

    /// Backend name, version and feature flags.
    pub async fn server_info(&self) -> Result<ServerInfo> {
        self.get_json(ApiRequest::get("/api/info")).await
    }

    pub async fn current_user(&self) -> Result<UserProfile> {
        self.get_json(ApiRequest::get("/api/me")).await
    }

    /// One page of the user's playlists.
    pub async fn playlists(&self, limit: u32, offset: u32) -> Result<PlaylistPage> {
        let request = ApiRequest::get("/api/spotify/playlists")
            .query("limit", limit)
            .query("offset", offset);
        self.get_json(request).await
    }

    pub async fn playlist(&self, id: &str) -> Result<PlaylistRef> {
        let id = path_segment(id)?;
        self.get_json(ApiRequest::get(format!("/api/spotify/playlists/{}", id)))
            .await
    }

    pub async fn playlist_tracks(&self, id: &str) -> Result<Vec<TrackSummary>> {
        let id = path_segment(id)?;
        let response: TracksResponse = self
            .get_json(ApiRequest::get(format!(
                "/api/spotify/playlists/{}/tracks",
                id
            )))
            .await?;
        Ok(response.items)
    }

    /// Audio features for `track_ids`, in batches of [`AUDIO_FEATURES_BATCH`].
    ///
    /// Tracks the backend has no features for are left out.
    pub async fn audio_features(&self, track_ids: &[String]) -> Result<Vec<AudioFeatureVector>> {
        let mut features = Vec::with_capacity(track_ids.len());
        for batch in track_ids.chunks(AUDIO_FEATURES_BATCH) {
            let request =
                ApiRequest::get("/api/spotify/audio-features").query("ids", batch.join(","));
            let response: AudioFeaturesResponse = self.get_json(request).await?;
            features.extend(response.audio_features.into_iter().flatten());
        }
        Ok(features)
    }

    /// Genre tags for the named artists.
    pub async fn artists(&self, names: &[String]) -> Result<Vec<ArtistGenres>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let request = ApiRequest::get("/api/spotify/artists").query("names", names.join(","));
        let response: ArtistsResponse = self.get_json(request).await?;
        Ok(response.artists)
    }

    /// Resolve an arbitrary request through the pipeline.
    pub async fn execute_with_cancel<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        cancel: CancellationToken,
    ) -> Result<T> {
        self.pipeline
            .execute_with_cancel(request, cancel)
            .await?
            .json()
    }

    async fn get_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        self.pipeline.execute(request).await?.json()
    }
}

/// Reject ids that would change the request path.
fn path_segment(id: &str) -> Result<&str> {
    if id.is_empty() || id.contains(['/', '?', '#']) {
        return Err(PipelineError::InvalidUrl(format!("Invalid id: {:?}", id)));
    }
    Ok(id)
}
