use super::{ErrorAction, RequestContext, Stage};
use crate::config::RetrySettings;
use crate::error::PipelineError;
use crate::types::ApiRequest;
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tracing::warn;

/// Resends transient failures with exponential backoff and jitter.
pub struct RetryStage {
    settings: RetrySettings,
}

impl RetryStage {
    pub fn new(settings: RetrySettings) -> Self {
        Self { settings }
    }

    /// Backoff before retry number `attempt + 1`, without jitter.
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.settings.base_delay().saturating_mul(factor)
    }

    /// Backoff with a random `0..=max_jitter` added.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let max_jitter = u64::try_from(self.settings.max_jitter().as_millis()).unwrap_or(u64::MAX);
        let jitter = if max_jitter == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=max_jitter)
        };
        self.base_delay_for(attempt) + Duration::from_millis(jitter)
    }
}

#[async_trait]
impl Stage for RetryStage {
    fn name(&self) -> &'static str {
        "retry"
    }

    async fn on_error(
        &self,
        request: &ApiRequest,
        error: &PipelineError,
        ctx: &mut RequestContext,
    ) -> ErrorAction {
        if !error.is_retryable() || ctx.attempt >= self.settings.max_attempts {
            return ErrorAction::Propagate;
        }

        let delay = self.delay_for(ctx.attempt);
        ctx.attempt += 1;
        warn!(
            method = %request.method,
            path = %request.path,
            attempt = ctx.attempt,
            max_attempts = self.settings.max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Retrying request"
        );
        ErrorAction::RetryAfter(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    fn stage(base_ms: u64, jitter_ms: u64, max_attempts: u32) -> RetryStage {
        RetryStage::new(RetrySettings {
            enabled: true,
            max_attempts,
            base_delay_ms: base_ms,
            max_jitter_ms: jitter_ms,
        })
    }

    fn http(status: u16) -> PipelineError {
        PipelineError::Http {
            status,
            code: crate::error::ErrorCode::from_status(status),
            message: String::new(),
        }
    }

    #[test]
    fn delay_doubles_per_attempt() {
        let stage = stage(1000, 0, 3);
        assert_eq!(stage.delay_for(0), Duration::from_millis(1000));
        assert_eq!(stage.delay_for(1), Duration::from_millis(2000));
        assert_eq!(stage.delay_for(2), Duration::from_millis(4000));
    }

    #[test]
    fn jitter_stays_within_bound() {
        let stage = stage(100, 50, 3);
        for _ in 0..200 {
            let delay = stage.delay_for(1);
            assert!(delay >= Duration::from_millis(200));
            assert!(delay <= Duration::from_millis(250));
        }
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let stage = stage(10, 0, 2);
        let request = ApiRequest::get("/api/info");
        let mut ctx = RequestContext::new(CancellationToken::new());

        for expected in [10, 20] {
            match stage.on_error(&request, &http(503), &mut ctx).await {
                ErrorAction::RetryAfter(delay) => {
                    assert_eq!(delay, Duration::from_millis(expected));
                }
                other => panic!("expected retry, got {:?}", other),
            }
        }
        assert!(matches!(
            stage.on_error(&request, &http(503), &mut ctx).await,
            ErrorAction::Propagate
        ));
        assert_eq!(ctx.attempt, 2);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let stage = stage(10, 0, 3);
        let request = ApiRequest::get("/api/info");
        let mut ctx = RequestContext::new(CancellationToken::new());

        for status in [400, 401, 403, 404, 429] {
            assert!(matches!(
                stage.on_error(&request, &http(status), &mut ctx).await,
                ErrorAction::Propagate
            ));
        }
        assert!(matches!(
            stage.on_error(&request, &http(408), &mut ctx).await,
            ErrorAction::RetryAfter(_)
        ));
        assert!(matches!(
            stage
                .on_error(
                    &request,
                    &PipelineError::Connection("refused".into()),
                    &mut ctx
                )
                .await,
            ErrorAction::RetryAfter(_)
        ));
    }
}
