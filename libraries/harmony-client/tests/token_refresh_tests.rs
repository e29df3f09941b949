//! Single-flight behaviour of the token refresh coordinator.

use async_trait::async_trait;
use futures_util::future::join_all;
use harmony_client::{RefreshState, TokenError, TokenGrant, TokenRefreshCoordinator, TokenRefresher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const BUFFER: Duration = Duration::from_secs(300);

/// Counts calls and answers after a delay, so callers pile up meanwhile.
struct CountingRefresher {
    calls: AtomicUsize,
    delay: Duration,
    fail: bool,
}

impl CountingRefresher {
    fn new(delay: Duration, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
            fail,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenRefresher for CountingRefresher {
    async fn refresh(&self, _refresh_token: Option<String>) -> Result<TokenGrant, TokenError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        if self.fail {
            return Err(TokenError::Rejected {
                status: 400,
                message: "invalid_grant".into(),
            });
        }
        Ok(TokenGrant {
            access_token: format!("token-{}", n),
            refresh_token: None,
            expires_in: Duration::from_secs(3600),
        })
    }
}

#[tokio::test]
async fn concurrent_callers_share_one_refresh() {
    let refresher = CountingRefresher::new(Duration::from_millis(100), false);
    let coordinator = Arc::new(TokenRefreshCoordinator::new(refresher.clone(), BUFFER));

    let results = join_all((0..25).map(|_| {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.get_token().await })
    }))
    .await;

    assert_eq!(refresher.calls(), 1);
    for result in results {
        assert_eq!(result.unwrap().unwrap(), "token-1");
    }
    assert_eq!(coordinator.state().await, RefreshState::Idle);
}

#[tokio::test]
async fn failure_reaches_every_waiter_identically() {
    let refresher = CountingRefresher::new(Duration::from_millis(100), true);
    let coordinator = Arc::new(TokenRefreshCoordinator::new(refresher.clone(), BUFFER));

    let results = join_all((0..10).map(|_| coordinator.get_token())).await;

    assert_eq!(refresher.calls(), 1);
    let expected = TokenError::Rejected {
        status: 400,
        message: "invalid_grant".into(),
    };
    for result in results {
        assert_eq!(result.unwrap_err(), expected);
    }
    assert_eq!(coordinator.state().await, RefreshState::Idle);

    // Not retried internally; the next caller starts a new refresh
    let _ = coordinator.get_token().await;
    assert_eq!(refresher.calls(), 2);
}

#[tokio::test]
async fn forced_refresh_joins_in_flight_refresh() {
    let refresher = CountingRefresher::new(Duration::from_millis(100), false);
    let coordinator = Arc::new(TokenRefreshCoordinator::new(refresher.clone(), BUFFER));

    let (a, b) = tokio::join!(coordinator.get_token(), coordinator.force_refresh(None));

    assert_eq!(refresher.calls(), 1);
    assert_eq!(a.unwrap(), b.unwrap());
}

#[tokio::test]
async fn abandoned_waiter_does_not_abort_refresh() {
    let refresher = CountingRefresher::new(Duration::from_millis(200), false);
    let coordinator = Arc::new(TokenRefreshCoordinator::new(refresher.clone(), BUFFER));

    let first = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.get_token().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(coordinator.state().await, RefreshState::Refreshing);
    first.abort();

    let token = coordinator.get_token().await.unwrap();
    assert_eq!(token, "token-1");
    assert_eq!(refresher.calls(), 1);
}

#[tokio::test]
async fn refresh_finishing_after_clear_is_discarded() {
    let refresher = CountingRefresher::new(Duration::from_millis(100), false);
    let coordinator = Arc::new(TokenRefreshCoordinator::new(refresher.clone(), BUFFER));

    let waiter = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.get_token().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    coordinator.clear().await;

    // The waiter that was already attached still gets its outcome
    assert_eq!(waiter.await.unwrap().unwrap(), "token-1");
    assert_eq!(coordinator.current_token().await, None);
}
