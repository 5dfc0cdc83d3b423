use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

use crate::config::ResilienceConfig;
use crate::context::RequestContext;

use super::circuit_breaker::CircuitBreaker;

#[derive(Debug, Clone, thiserror::Error)]
pub(crate) enum FeedError {
    #[error("network error calling feed")]
    Network,
    #[error("feed timed out")]
    Timeout,
    #[error("feed returned status {0}")]
    Status(u16),
    #[error("feed response failed to parse: missing required field")]
    Parse,
    /// Circuit breaker is open; the call was never attempted.
    #[error("circuit open")]
    BreakerOpen,
}

impl FeedError {
    fn is_retriable(&self) -> bool {
        match self {
            FeedError::Network | FeedError::Timeout => true,
            FeedError::Status(code) => *code >= 500,
            FeedError::Parse | FeedError::BreakerOpen => false,
        }
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FeedError::Timeout
        } else if let Some(status) = e.status() {
            FeedError::Status(status.as_u16())
        } else {
            FeedError::Network
        }
    }
}

/// Shared resilience wrapper used by all three feed clients (§4.3):
/// breaker gate, bounded retries with exponential backoff + jitter, and a
/// deadline capped by both the per-call timeout and the request's
/// remaining budget.
pub(crate) struct ResilientCaller {
    breaker: CircuitBreaker,
    resilience: ResilienceConfig,
}

impl ResilientCaller {
    pub(crate) fn new(resilience: ResilienceConfig) -> Self {
        Self {
            breaker: CircuitBreaker::new(&resilience),
            resilience,
        }
    }

    pub(crate) fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Runs `attempt` under the breaker gate with bounded exponential
    /// backoff. `attempt` should perform one network round trip per call.
    pub(crate) async fn call<T, F, Fut>(&self, ctx: &RequestContext, attempt: F) -> Result<T, FeedError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, FeedError>>,
    {
        if !self.breaker.allow_request() {
            return Err(FeedError::BreakerOpen);
        }

        let deadline = ctx.call_budget(self.resilience.per_call_timeout);
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(500))
            .with_factor(2.0)
            .with_max_delay(Duration::from_secs(5))
            .with_max_times((self.resilience.max_attempts.saturating_sub(1)) as usize)
            .with_jitter();

        let result = (|| async {
            tokio::time::timeout(deadline, attempt())
                .await
                .unwrap_or(Err(FeedError::Timeout))
        })
        .retry(backoff)
        .when(|e: &FeedError| e.is_retriable())
        .await;

        match &result {
            Ok(_) => self.breaker.record_success(),
            Err(e) if !matches!(e, FeedError::BreakerOpen) => self.breaker.record_failure(),
            Err(_) => {}
        }

        result
    }
}
