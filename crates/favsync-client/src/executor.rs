//! Retryable execution of favorite mutations.
//!
//! Drives the attempt state machine from favsync-core over tokio
//! timers. This is the single chokepoint through which every
//! unrecoverable favorite-operation error passes exactly once: it logs
//! structured details, carries the classified user-facing message in
//! the returned error, and forwards to the error-tracking sink if one
//! is present. Callers must not report the same failure again.

use std::future::Future;
use std::sync::Arc;

use favsync_core::{ApiFailure, AttemptState, FavoriteError, RetryPolicy};

use crate::api::ErrorSink;

pub struct RetryExecutor {
    policy: RetryPolicy,
    sink: Option<Arc<dyn ErrorSink>>,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, sink: None }
    }

    pub fn with_sink(policy: RetryPolicy, sink: Arc<dyn ErrorSink>) -> Self {
        Self {
            policy,
            sink: Some(sink),
        }
    }

    /// Run `op`, retrying transient failures with backoff until the
    /// policy gives up. Retries are sequential, never concurrent.
    pub async fn run<T, F, Fut>(&self, context: &'static str, mut op: F) -> Result<T, FavoriteError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiFailure>>,
    {
        let mut state = AttemptState::new();

        loop {
            let failure = match op().await {
                Ok(value) => return Ok(value),
                Err(failure) => failure,
            };

            let error = FavoriteError::classify(&failure);
            state = state.on_failure(&self.policy, error);

            if let AttemptState::TerminalFailure(error) = &state {
                tracing::error!(
                    context,
                    status = ?error.status(),
                    code = error.code(),
                    message = %error,
                    "favorite operation failed permanently"
                );
                if let Some(sink) = &self.sink {
                    sink.report(error, context);
                }
                return Err(error.clone());
            }

            if let AttemptState::RetryScheduled { attempt, delay } = &state {
                tracing::warn!(
                    context,
                    attempt = *attempt,
                    delay_ms = delay.as_millis() as u64,
                    "favorite operation failed, retry scheduled"
                );
                tokio::time::sleep(*delay).await;
            }
            state = state.on_retry();
        }
    }
}
