use super::{RequestContext, Stage};
use crate::cache::{cache_key, CacheStore};
use crate::error::Result;
use crate::types::{ApiRequest, ApiResponse};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Serves read requests from the response cache and stores 2xx responses.
pub struct CacheStage {
    store: Arc<CacheStore>,
    ttl: Duration,
}

impl CacheStage {
    pub fn new(store: Arc<CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }
}

#[async_trait]
impl Stage for CacheStage {
    fn name(&self) -> &'static str {
        "cache"
    }

    async fn on_request(
        &self,
        request: &mut ApiRequest,
        ctx: &mut RequestContext,
    ) -> Result<Option<ApiResponse>> {
        if !request.is_read() {
            return Ok(None);
        }
        // Resends after a failure never re-check the cache
        if ctx.cache_key.is_some() {
            return Ok(None);
        }

        let key = cache_key(&request.method, &request.path, &request.query);
        let hit = self.store.get(&key);
        ctx.cache_key = Some(key);

        Ok(hit.map(|mut response| {
            debug!(key = ctx.cache_key.as_deref().unwrap_or_default(), "Cache hit");
            response.from_cache = true;
            response
        }))
    }

    async fn on_response(
        &self,
        _request: &ApiRequest,
        response: &ApiResponse,
        ctx: &mut RequestContext,
    ) {
        if let Some(key) = &ctx.cache_key {
            if response.is_success() {
                self.store.set(key.clone(), response.clone(), self.ttl);
            }
        }
    }
}
