//! Capability token ownership and single-flight refresh.
//!
//! ```text
//!            get_token() with a stale token
//!   ┌──────┐ ─────────────────────────────► ┌────────────┐
//!   │ Idle │                                │ Refreshing │ ◄── later callers attach
//!   └──────┘ ◄───────────────────────────── └────────────┘     to the same handle
//!            refresh finished (ok or error),
//!            every waiter gets the same outcome
//! ```
//!
//! The refresh runs on its own task so a caller that gives up (timeout,
//! cancellation, dropped future) never aborts it for the remaining waiters.

use crate::credentials::{CredentialKey, CredentialStore};
use crate::error::TokenError;
use crate::transport::map_send_error;
use crate::types::{RefreshTokenRequest, RefreshTokenResponse};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Outcome of a successful refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    /// Replaces the held refresh token when present
    pub refresh_token: Option<String>,
    pub expires_in: Duration,
}

/// Performs the actual refresh call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(
        &self,
        refresh_token: Option<String>,
    ) -> std::result::Result<TokenGrant, TokenError>;
}

/// Whether a refresh is currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

/// Longest token lifetime honoured; larger `expires_in` values are clamped.
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(365 * 24 * 60 * 60);

pub(crate) fn capped_lifetime(lifetime: Duration) -> Duration {
    lifetime.min(MAX_TOKEN_LIFETIME)
}

fn deadline(lifetime: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(capped_lifetime(lifetime)).unwrap_or(now)
}

type PendingRefresh = Shared<BoxFuture<'static, std::result::Result<String, TokenError>>>;

#[derive(Default)]
struct TokenState {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<Instant>,
    in_flight: Option<PendingRefresh>,
    /// Bumped on every refresh start and on `clear`, so a refresh that
    /// finishes after sign-out does not resurrect its token.
    generation: u64,
}

impl TokenState {
    fn valid_token(&self, buffer: Duration) -> Option<String> {
        let token = self.access_token.as_ref()?;
        let expires_at = self.expires_at?;
        if deadline(buffer) < expires_at {
            Some(token.clone())
        } else {
            None
        }
    }
}

/// Sole owner of the capability token.
///
/// At most one refresh is in flight at any time; every caller that needs a
/// token while it runs waits on the same shared handle and observes the same
/// token or the same failure. Failures are not retried here.
pub struct TokenRefreshCoordinator {
    state: Arc<Mutex<TokenState>>,
    refresher: Arc<dyn TokenRefresher>,
    credentials: Option<Arc<dyn CredentialStore>>,
    expiry_buffer: Duration,
}

impl TokenRefreshCoordinator {
    pub fn new(refresher: Arc<dyn TokenRefresher>, expiry_buffer: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(TokenState::default())),
            refresher,
            credentials: None,
            expiry_buffer,
        }
    }

    /// Persist refreshed tokens to `store`.
    pub fn with_credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(store);
        self
    }

    /// Return a valid capability token, refreshing it first if needed.
    pub async fn get_token(&self) -> std::result::Result<String, TokenError> {
        let pending = {
            let mut state = self.state.lock().await;
            if state.in_flight.is_none() {
                if let Some(token) = state.valid_token(self.expiry_buffer) {
                    return Ok(token);
                }
            }
            self.pending_refresh(&mut state)
        };
        pending.await
    }

    /// Refresh because the backend rejected `rejected`.
    ///
    /// If the held token already differs from the rejected one and is still
    /// valid, another request refreshed in the meantime and that token is
    /// returned without a new refresh. An in-flight refresh is joined.
    pub async fn force_refresh(
        &self,
        rejected: Option<&str>,
    ) -> std::result::Result<String, TokenError> {
        let pending = {
            let mut state = self.state.lock().await;
            if state.in_flight.is_none() {
                if let Some(token) = state.valid_token(self.expiry_buffer) {
                    if rejected.is_some_and(|r| r != token) {
                        return Ok(token);
                    }
                }
            }
            self.pending_refresh(&mut state)
        };
        pending.await
    }

    /// Join the in-flight refresh or start a new one.
    ///
    /// Must be called with the state lock held.
    fn pending_refresh(&self, state: &mut TokenState) -> PendingRefresh {
        if let Some(pending) = &state.in_flight {
            debug!("Joining in-flight token refresh");
            return pending.clone();
        }

        state.generation += 1;
        let generation = state.generation;
        let refresh_token = state.refresh_token.clone();
        let refresher = Arc::clone(&self.refresher);
        let shared_state = Arc::clone(&self.state);
        let credentials = self.credentials.clone();

        debug!(generation, "Starting token refresh");

        let task = tokio::spawn(async move {
            let outcome = refresher.refresh(refresh_token).await;

            let mut state = shared_state.lock().await;
            let current = state.generation == generation;
            if current {
                state.in_flight = None;
            }

            match outcome {
                Ok(grant) => {
                    if current {
                        state.access_token = Some(grant.access_token.clone());
                        if grant.refresh_token.is_some() {
                            state.refresh_token = grant.refresh_token.clone();
                        }
                        state.expires_at = Some(deadline(grant.expires_in));
                    }
                    drop(state);

                    if current {
                        if let Some(store) = credentials {
                            persist(store.as_ref(), &grant).await;
                        }
                        info!("Capability token refreshed");
                    }
                    Ok(grant.access_token)
                }
                Err(e) => {
                    warn!(error = %e, "Capability token refresh failed");
                    Err(e)
                }
            }
        });

        let aborted_state = Arc::clone(&self.state);
        let pending: PendingRefresh = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(error = %e, "Token refresh task ended abnormally");
                    let mut state = aborted_state.lock().await;
                    if state.generation == generation {
                        state.in_flight = None;
                    }
                    Err(TokenError::Aborted)
                }
            }
        }
        .boxed()
        .shared();

        state.in_flight = Some(pending.clone());
        pending
    }

    /// Install tokens obtained at sign-in.
    pub async fn set_tokens(
        &self,
        access_token: String,
        refresh_token: Option<String>,
        expires_in: Option<Duration>,
    ) {
        let mut state = self.state.lock().await;
        state.access_token = Some(access_token);
        state.refresh_token = refresh_token;
        // Unknown expiry: treat as already stale so the first use refreshes
        state.expires_at = Some(deadline(expires_in.unwrap_or_default()));
    }

    /// Load tokens persisted by an earlier session.
    ///
    /// Returns whether an access token was found.
    pub async fn restore(&self) -> bool {
        let Some(store) = &self.credentials else {
            return false;
        };

        let access = store
            .get(CredentialKey::CapabilityAccessToken)
            .await
            .ok()
            .flatten();
        let refresh = store
            .get(CredentialKey::CapabilityRefreshToken)
            .await
            .ok()
            .flatten();
        let expires_in = store
            .get(CredentialKey::CapabilityExpiresAt)
            .await
            .ok()
            .flatten()
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .and_then(|at| (at.with_timezone(&Utc) - Utc::now()).to_std().ok());

        let mut state = self.state.lock().await;
        state.refresh_token = refresh;
        match access {
            Some(token) => {
                state.access_token = Some(token);
                state.expires_at = Some(deadline(expires_in.unwrap_or_default()));
                true
            }
            None => false,
        }
    }

    /// Forget every token and detach from any in-flight refresh.
    ///
    /// Waiters already attached still receive that refresh's outcome, but
    /// its token is not stored.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.generation += 1;
        state.access_token = None;
        state.refresh_token = None;
        state.expires_at = None;
        state.in_flight = None;
    }

    pub async fn state(&self) -> RefreshState {
        if self.state.lock().await.in_flight.is_some() {
            RefreshState::Refreshing
        } else {
            RefreshState::Idle
        }
    }

    /// Currently held access token, valid or not.
    pub async fn current_token(&self) -> Option<String> {
        self.state.lock().await.access_token.clone()
    }
}

async fn persist(store: &dyn CredentialStore, grant: &TokenGrant) {
    let expires_at = chrono::Duration::from_std(capped_lifetime(grant.expires_in))
        .ok()
        .and_then(|d| Utc::now().checked_add_signed(d))
        .map(|at| at.to_rfc3339());

    let mut writes = vec![(
        CredentialKey::CapabilityAccessToken,
        grant.access_token.clone(),
    )];
    if let Some(refresh) = &grant.refresh_token {
        writes.push((CredentialKey::CapabilityRefreshToken, refresh.clone()));
    }
    if let Some(at) = expires_at {
        writes.push((CredentialKey::CapabilityExpiresAt, at));
    }

    for (key, value) in writes {
        if let Err(e) = store.set(key, value).await {
            warn!(key = key.as_str(), error = %e, "Failed to persist refreshed token");
        }
    }
}

/// Refreshes the capability token through the Harmony backend.
///
/// Talks to the backend directly rather than through the pipeline, so a
/// refresh can never trigger another refresh.
pub struct BackendTokenRefresher {
    http: Client,
    url: String,
    credentials: Arc<dyn CredentialStore>,
    timeout: Duration,
}

impl BackendTokenRefresher {
    /// `base_url` must already be normalized; `refresh_path` is appended.
    pub fn new(
        http: Client,
        base_url: &str,
        refresh_path: &str,
        credentials: Arc<dyn CredentialStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            url: format!("{}{}", base_url, refresh_path),
            credentials,
            timeout,
        }
    }
}

#[async_trait]
impl TokenRefresher for BackendTokenRefresher {
    async fn refresh(
        &self,
        refresh_token: Option<String>,
    ) -> std::result::Result<TokenGrant, TokenError> {
        let identity = self
            .credentials
            .get(CredentialKey::IdentityToken)
            .await
            .ok()
            .flatten();
        if identity.is_none() && refresh_token.is_none() {
            return Err(TokenError::NoRefreshToken);
        }

        debug!(url = %self.url, "Refreshing capability token");

        let mut request = self
            .http
            .post(&self.url)
            .json(&RefreshTokenRequest { refresh_token });
        if let Some(identity) = identity {
            request = request.bearer_auth(identity);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TokenError::Transport(map_send_error(e, self.timeout).to_string()))?;

        let status = response.status();
        if status.is_success() {
            let body: RefreshTokenResponse = response.json().await.map_err(|e| {
                TokenError::Transport(format!("Failed to parse refresh response: {}", e))
            })?;
            Ok(TokenGrant {
                access_token: body.access_token,
                refresh_token: body.refresh_token,
                expires_in: Duration::from_secs(body.expires_in),
            })
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(TokenError::Rejected {
                status: status.as_u16(),
                message,
            })
        }
    }
}
