use super::{ErrorAction, RequestContext, Stage};
use crate::config::AuthSettings;
use crate::credentials::{CredentialKey, CredentialStore};
use crate::error::{PipelineError, Result, TokenError};
use crate::token::TokenRefreshCoordinator;
use crate::types::{ApiRequest, ApiResponse};
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION};
use std::sync::Arc;
use tracing::{debug, warn};

/// Header carrying the capability credential on gated endpoints.
pub const CAPABILITY_HEADER: &str = "x-capability-token";

/// Attaches credentials and recovers once from a rejected capability token.
pub struct AuthStage {
    credentials: Arc<dyn CredentialStore>,
    tokens: Option<Arc<TokenRefreshCoordinator>>,
    settings: AuthSettings,
}

impl AuthStage {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        tokens: Option<Arc<TokenRefreshCoordinator>>,
        settings: AuthSettings,
    ) -> Self {
        Self {
            credentials,
            tokens,
            settings,
        }
    }

    async fn capability_token(
        &self,
        tokens: &TokenRefreshCoordinator,
        ctx: &RequestContext,
    ) -> Result<Option<String>> {
        let token = tokio::select! {
            () = ctx.cancel.cancelled() => return Err(PipelineError::Cancelled),
            token = tokens.get_token() => token,
        };

        match token {
            Ok(token) => Ok(Some(token)),
            Err(e) => {
                // The held token may still be accepted; a 401 comes back to on_error
                let held = tokens.current_token().await;
                if held.is_some() {
                    warn!(error = %e, "Refresh failed, sending held capability token");
                } else {
                    warn!(error = %e, "Proceeding without capability token");
                }
                Ok(held)
            }
        }
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| PipelineError::Credentials(format!("Invalid header value: {}", e)))
}

#[async_trait]
impl Stage for AuthStage {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn on_request(
        &self,
        request: &mut ApiRequest,
        ctx: &mut RequestContext,
    ) -> Result<Option<ApiResponse>> {
        let identity = self
            .credentials
            .get(CredentialKey::IdentityToken)
            .await?;
        if let Some(identity) = identity {
            request
                .headers
                .insert(AUTHORIZATION, header_value(&format!("Bearer {}", identity))?);
        }

        ctx.capability_gated = self.settings.requires_capability(&request.path);
        ctx.capability_token = None;
        if !ctx.capability_gated {
            return Ok(None);
        }

        let Some(tokens) = &self.tokens else {
            return Ok(None);
        };
        if let Some(token) = self.capability_token(tokens, ctx).await? {
            request
                .headers
                .insert(HeaderName::from_static(CAPABILITY_HEADER), header_value(&token)?);
            ctx.capability_token = Some(token);
        }

        Ok(None)
    }

    async fn on_error(
        &self,
        request: &ApiRequest,
        error: &PipelineError,
        ctx: &mut RequestContext,
    ) -> ErrorAction {
        if error.status_code() != Some(401) || !ctx.capability_gated {
            return ErrorAction::Propagate;
        }
        let Some(tokens) = &self.tokens else {
            return ErrorAction::Propagate;
        };

        if ctx.auth_retried {
            warn!(path = %request.path, "Capability token rejected after refresh");
            return ErrorAction::Fail(PipelineError::TokenExpired(request.path.clone()));
        }
        ctx.auth_retried = true;

        debug!(path = %request.path, "Capability token rejected, refreshing");
        let refreshed = tokio::select! {
            () = ctx.cancel.cancelled() => return ErrorAction::Fail(PipelineError::Cancelled),
            refreshed = tokens.force_refresh(ctx.capability_token.as_deref()) => refreshed,
        };

        match refreshed {
            Ok(_) => ErrorAction::Resend,
            Err(TokenError::NoRefreshToken) => {
                ErrorAction::Fail(PipelineError::TokenRequired(request.path.clone()))
            }
            Err(e) => ErrorAction::Fail(PipelineError::TokenRefresh(e)),
        }
    }
}
