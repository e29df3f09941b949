//! Request pipeline: ordered stages around a single transport.
//!
//! ```text
//!  request ──► [cache] ──► [auth] ──► [retry] ──► dispatch
//!                                                    │
//!  response ◄── [cache] ◄── [auth] ◄── [retry] ◄─────┤ success
//!                                                    │
//!               on_error, in stage order ◄───────────┘ failure
//!               (first stage that acts decides: resend, back off, fail)
//! ```
//!
//! Stages are assembled once, in a fixed order, by [`RequestPipelineBuilder`].
//! Each is switched on or off by its own config flag.

mod auth_stage;
mod cache_stage;
mod retry_stage;

pub use auth_stage::{AuthStage, CAPABILITY_HEADER};
pub use cache_stage::CacheStage;
pub use retry_stage::RetryStage;

use crate::cache::CacheStore;
use crate::config::PipelineConfig;
use crate::credentials::{CredentialStore, MemoryCredentialStore};
use crate::error::{PipelineError, Result};
use crate::token::TokenRefreshCoordinator;
use crate::transport::HttpTransport;
use crate::types::{ApiRequest, ApiResponse};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Per-request scratch space shared by the stages.
///
/// Created when a logical request starts and dropped when it resolves.
#[derive(Debug)]
pub struct RequestContext {
    /// Cache key computed by the cache stage for read requests
    pub cache_key: Option<String>,
    /// Retries consumed so far
    pub attempt: u32,
    /// Whether the auth stage already spent its refresh-and-resend
    pub auth_retried: bool,
    /// Whether the path is on the capability allowlist
    pub capability_gated: bool,
    /// Capability token attached on the latest pass
    pub capability_token: Option<String>,
    /// Network dispatches made so far
    pub dispatches: u32,
    pub cancel: CancellationToken,
}

impl RequestContext {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cache_key: None,
            attempt: 0,
            auth_retried: false,
            capability_gated: false,
            capability_token: None,
            dispatches: 0,
            cancel,
        }
    }
}

/// What a stage wants done about a failed dispatch.
#[derive(Debug)]
pub enum ErrorAction {
    /// Not this stage's concern
    Propagate,
    /// Send again right away
    Resend,
    /// Send again after a delay
    RetryAfter(Duration),
    /// Fail with a different error
    Fail(PipelineError),
}

/// One layer of the pipeline.
///
/// Stages hold no per-request state of their own; anything request-scoped
/// lives in [`RequestContext`], so one stage instance serves any number of
/// concurrent requests.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs before dispatch. Returning a response short-circuits the
    /// pipeline and skips the network entirely.
    async fn on_request(
        &self,
        _request: &mut ApiRequest,
        _ctx: &mut RequestContext,
    ) -> Result<Option<ApiResponse>> {
        Ok(None)
    }

    /// Runs after a successful dispatch, in reverse stage order.
    async fn on_response(
        &self,
        _request: &ApiRequest,
        _response: &ApiResponse,
        _ctx: &mut RequestContext,
    ) {
    }

    /// Runs after a failed dispatch, in stage order, until a stage acts.
    async fn on_error(
        &self,
        _request: &ApiRequest,
        _error: &PipelineError,
        _ctx: &mut RequestContext,
    ) -> ErrorAction {
        ErrorAction::Propagate
    }
}

/// Resolves logical requests through the configured stages.
pub struct RequestPipeline {
    stages: Vec<Arc<dyn Stage>>,
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
    max_dispatches: u32,
    cache: Arc<CacheStore>,
    credentials: Arc<dyn CredentialStore>,
    tokens: Option<Arc<TokenRefreshCoordinator>>,
}

impl RequestPipeline {
    pub fn builder(config: PipelineConfig) -> RequestPipelineBuilder {
        RequestPipelineBuilder::new(config)
    }

    /// Resolve a request.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.execute_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Resolve a request that the caller may cancel.
    ///
    /// Cancelling aborts the in-flight dispatch or backoff sleep and returns
    /// [`PipelineError::Cancelled`]. A token refresh this request is waiting
    /// on keeps running for its other waiters.
    pub async fn execute_with_cancel(
        &self,
        request: ApiRequest,
        cancel: CancellationToken,
    ) -> Result<ApiResponse> {
        let mut ctx = RequestContext::new(cancel);
        let mut last_error = None;

        while ctx.dispatches < self.max_dispatches {
            if ctx.cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }

            let mut outgoing = request.clone();
            for stage in &self.stages {
                if let Some(response) = stage.on_request(&mut outgoing, &mut ctx).await? {
                    debug!(
                        stage = stage.name(),
                        method = %request.method,
                        path = %request.path,
                        "Request resolved without dispatch"
                    );
                    return Ok(response);
                }
            }

            ctx.dispatches += 1;
            let error = match self.dispatch(&outgoing, &ctx.cancel).await {
                Ok(response) => {
                    for stage in self.stages.iter().rev() {
                        stage.on_response(&outgoing, &response, &mut ctx).await;
                    }
                    return Ok(response);
                }
                Err(PipelineError::Cancelled) => return Err(PipelineError::Cancelled),
                Err(error) => error,
            };

            let mut action = ErrorAction::Propagate;
            for stage in &self.stages {
                action = stage.on_error(&outgoing, &error, &mut ctx).await;
                if !matches!(action, ErrorAction::Propagate) {
                    break;
                }
            }

            match action {
                ErrorAction::Propagate => return Err(error),
                ErrorAction::Fail(replacement) => return Err(replacement),
                ErrorAction::Resend => {}
                ErrorAction::RetryAfter(delay) => {
                    tokio::select! {
                        () = ctx.cancel.cancelled() => return Err(PipelineError::Cancelled),
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
            last_error = Some(error);
        }

        warn!(
            method = %request.method,
            path = %request.path,
            dispatches = ctx.dispatches,
            "Dispatch limit reached"
        );
        Err(last_error.unwrap_or(PipelineError::Cancelled))
    }

    /// One network call, bounded by the timeout and the cancellation token.
    async fn dispatch(
        &self,
        request: &ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse> {
        debug!(method = %request.method, path = %request.path, "Dispatching request");

        let response = tokio::select! {
            () = cancel.cancelled() => return Err(PipelineError::Cancelled),
            result = tokio::time::timeout(self.timeout, self.transport.send(request)) => {
                result.map_err(|_| PipelineError::Timeout(self.timeout))??
            }
        };

        if response.is_success() {
            Ok(response)
        } else {
            Err(PipelineError::from_response(&response))
        }
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    pub fn tokens(&self) -> Option<&Arc<TokenRefreshCoordinator>> {
        self.tokens.as_ref()
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }
}

/// Assembles a [`RequestPipeline`] from config and injected services.
pub struct RequestPipelineBuilder {
    config: PipelineConfig,
    transport: Option<Arc<dyn HttpTransport>>,
    cache: Option<Arc<CacheStore>>,
    credentials: Option<Arc<dyn CredentialStore>>,
    tokens: Option<Arc<TokenRefreshCoordinator>>,
}

impl RequestPipelineBuilder {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            transport: None,
            cache: None,
            credentials: None,
            tokens: None,
        }
    }

    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn cache_store(mut self, cache: Arc<CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn credentials(mut self, credentials: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn token_coordinator(mut self, tokens: Arc<TokenRefreshCoordinator>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Build the pipeline. Stage order is cache, auth, retry.
    pub fn build(self) -> Result<RequestPipeline> {
        let transport = self
            .transport
            .ok_or_else(|| PipelineError::InvalidUrl("No transport configured".into()))?;
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(CacheStore::new(self.config.cache.capacity)));
        let credentials = self
            .credentials
            .unwrap_or_else(|| Arc::new(MemoryCredentialStore::new()));

        let mut stages: Vec<Arc<dyn Stage>> = Vec::new();
        if self.config.cache.enabled {
            stages.push(Arc::new(CacheStage::new(
                Arc::clone(&cache),
                self.config.cache.ttl(),
            )));
        }
        if self.config.auth.enabled {
            stages.push(Arc::new(AuthStage::new(
                Arc::clone(&credentials),
                self.tokens.clone(),
                self.config.auth.clone(),
            )));
        }
        if self.config.retry.enabled {
            stages.push(Arc::new(RetryStage::new(self.config.retry.clone())));
        }

        let max_attempts = if self.config.retry.enabled {
            self.config.retry.max_attempts
        } else {
            0
        };

        Ok(RequestPipeline {
            stages,
            transport,
            timeout: self.config.timeout(),
            // First attempt, every retry, one auth resend
            max_dispatches: max_attempts.saturating_add(2),
            cache,
            credentials,
            tokens: self.tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use reqwest::header::HeaderMap;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed list of statuses and records every request it sees.
    struct ScriptedTransport {
        statuses: Mutex<VecDeque<u16>>,
        seen: Mutex<Vec<ApiRequest>>,
    }

    impl ScriptedTransport {
        fn new(statuses: &[u16]) -> Arc<Self> {
            Arc::new(Self {
                statuses: Mutex::new(statuses.iter().copied().collect()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
            self.seen.lock().unwrap().push(request.clone());
            let status = self.statuses.lock().unwrap().pop_front().unwrap_or(200);
            Ok(ApiResponse {
                status,
                headers: HeaderMap::new(),
                body: Bytes::from_static(b"{}"),
                from_cache: false,
            })
        }
    }

    fn config(max_attempts: u32) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.retry.max_attempts = max_attempts;
        config.retry.base_delay_ms = 100;
        config.retry.max_jitter_ms = 0;
        config
    }

    fn pipeline(config: PipelineConfig, transport: Arc<ScriptedTransport>) -> RequestPipeline {
        RequestPipeline::builder(config)
            .transport(transport)
            .build()
            .unwrap()
    }

    #[test]
    fn stages_follow_fixed_order_and_toggles() {
        let all = pipeline(config(3), ScriptedTransport::new(&[]));
        assert_eq!(all.stage_names(), vec!["cache", "auth", "retry"]);

        let mut partial = config(3);
        partial.cache.enabled = false;
        partial.retry.enabled = false;
        let partial = pipeline(partial, ScriptedTransport::new(&[]));
        assert_eq!(partial.stage_names(), vec!["auth"]);
    }

    #[test]
    fn builder_requires_transport() {
        assert!(RequestPipeline::builder(PipelineConfig::default())
            .build()
            .is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_back_off_then_succeed() {
        let transport = ScriptedTransport::new(&[503, 503, 200]);
        let pipeline = pipeline(config(3), Arc::clone(&transport));

        let started = tokio::time::Instant::now();
        let response = pipeline.execute(ApiRequest::get("/api/info")).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(transport.calls(), 3);
        // 100ms then 200ms
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_stop_at_max_attempts() {
        let transport = ScriptedTransport::new(&[500, 500, 500, 500, 500]);
        let pipeline = pipeline(config(2), Arc::clone(&transport));

        let err = pipeline
            .execute(ApiRequest::get("/api/info"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(500));
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let transport = ScriptedTransport::new(&[404]);
        let pipeline = pipeline(config(3), Arc::clone(&transport));

        let err = pipeline
            .execute(ApiRequest::get("/api/missing"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn second_read_is_served_from_cache() {
        let transport = ScriptedTransport::new(&[200]);
        let pipeline = pipeline(config(3), Arc::clone(&transport));

        let first = pipeline.execute(ApiRequest::get("/api/info")).await.unwrap();
        let second = pipeline.execute(ApiRequest::get("/api/info/")).await.unwrap();

        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn failed_reads_are_not_cached() {
        let transport = ScriptedTransport::new(&[404, 200]);
        let pipeline = pipeline(config(0), Arc::clone(&transport));

        assert!(pipeline.execute(ApiRequest::get("/api/x")).await.is_err());
        assert!(pipeline.cache().is_empty());
        assert!(pipeline.execute(ApiRequest::get("/api/x")).await.is_ok());
        assert_eq!(pipeline.cache().len(), 1);
    }

    #[tokio::test]
    async fn writes_bypass_cache() {
        let transport = ScriptedTransport::new(&[200, 200]);
        let pipeline = pipeline(config(3), Arc::clone(&transport));

        let body = serde_json::json!({"a": 1});
        pipeline
            .execute(ApiRequest::post("/api/x", body.clone()))
            .await
            .unwrap();
        pipeline
            .execute(ApiRequest::post("/api/x", body))
            .await
            .unwrap();
        assert_eq!(transport.calls(), 2);
        assert!(pipeline.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_backoff() {
        let transport = ScriptedTransport::new(&[503, 200]);
        let mut config = config(3);
        config.retry.base_delay_ms = 60_000;
        let pipeline = pipeline(config, Arc::clone(&transport));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let started = tokio::time::Instant::now();
        let err = pipeline
            .execute_with_cancel(ApiRequest::get("/api/info"), cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(60));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn identity_token_is_attached() {
        let transport = ScriptedTransport::new(&[200]);
        let credentials: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
        credentials
            .set(
                crate::credentials::CredentialKey::IdentityToken,
                "id-123".into(),
            )
            .await
            .unwrap();

        let pipeline = RequestPipeline::builder(config(0))
            .transport(Arc::clone(&transport) as Arc<dyn HttpTransport>)
            .credentials(credentials)
            .build()
            .unwrap();
        pipeline.execute(ApiRequest::get("/api/me")).await.unwrap();

        let seen = transport.seen.lock().unwrap();
        assert_eq!(
            seen[0].headers.get(reqwest::header::AUTHORIZATION).unwrap(),
            "Bearer id-123"
        );
    }
}
