//! Types for Harmony backend requests and responses.

use crate::error::{PipelineError, Result};
use bytes::Bytes;
use harmony_core::{AudioFeatureVector, PlaylistRef, TrackSummary};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// =============================================================================
// Pipeline Types
// =============================================================================

/// A logical request as it travels through the pipeline.
///
/// Stages may add headers to the outgoing copy; the original is kept intact
/// so every resend starts from the caller's request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the backend base URL, e.g. `/api/me`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Create a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Create a POST request with a JSON body.
    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            body: Some(body),
            ..Self::new(Method::POST, path)
        }
    }

    /// Append a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Set a header, replacing any previous value.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Idempotent read requests are the only ones served from cache.
    pub fn is_read(&self) -> bool {
        self.method == Method::GET || self.method == Method::HEAD
    }
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// True when served by the cache stage without a network call
    pub from_cache: bool,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| PipelineError::ParseError(format!("Invalid JSON body: {}", e)))
    }

    /// Body as UTF-8 text (lossy).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

// =============================================================================
// Authentication Types
// =============================================================================

/// Credentials handed over after the user signs in.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Primary identity credential for the Harmony backend
    pub identity_token: String,
    /// Capability credential for external-platform data
    pub capability_token: Option<String>,
    pub capability_refresh_token: Option<String>,
    /// Capability token validity in seconds
    pub capability_expires_in: Option<u64>,
}

/// Request body for the capability refresh endpoint.
#[derive(Debug, Serialize)]
pub struct RefreshTokenRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Response from the capability refresh endpoint.
#[derive(Debug, Deserialize)]
pub struct RefreshTokenResponse {
    pub access_token: String,
    /// Present when the refresh token was rotated
    pub refresh_token: Option<String>,
    /// Token validity in seconds
    pub expires_in: u64,
}

/// Current user info.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    /// Whether an external music account is linked
    #[serde(default)]
    pub platform_connected: bool,
}

// =============================================================================
// Server Info Types
// =============================================================================

/// Information about the Harmony backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub features: Vec<String>,
}

// =============================================================================
// Library Types
// =============================================================================

/// One page of a paginated listing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u32,
    #[serde(default)]
    pub offset: u32,
    /// URL of the next page, if any
    #[serde(default)]
    pub next: Option<String>,
}

/// Playlist tracks response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TracksResponse {
    pub items: Vec<TrackSummary>,
}

/// Audio features response; unknown tracks come back as `null`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AudioFeaturesResponse {
    pub audio_features: Vec<Option<AudioFeatureVector>>,
}

/// Artist with its genre tags.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArtistGenres {
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ArtistsResponse {
    pub artists: Vec<ArtistGenres>,
}

/// Convenience alias for playlist listings.
pub type PlaylistPage = Page<PlaylistRef>;
