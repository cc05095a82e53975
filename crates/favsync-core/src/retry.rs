//! Retry policy: eligibility, exponential backoff with jitter, and the
//! per-mutation attempt state machine.
//!
//! The machine replaces the callback-recursive timer chain of the
//! original client with explicit states, so backoff can be unit tested
//! without real timers:
//!
//! `Pending -> { Success | RetryScheduled -> Pending | TerminalFailure }`

use std::time::Duration;

use rand::Rng;

use crate::error::FavoriteError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts at or beyond this count are never retried.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Jitter drawn uniformly from [0, ratio * exponential term).
    pub jitter_ratio: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(30_000),
            jitter_ratio: 0.10,
        }
    }
}

impl RetryPolicy {
    /// Whether a failed attempt should be retried. `attempt` is
    /// zero-based: the first failure passes 0.
    pub fn should_retry(&self, error: &FavoriteError, attempt: u32) -> bool {
        if attempt >= self.max_attempts {
            return false;
        }
        error.is_retryable()
    }

    /// Backoff before the next attempt:
    /// `min(base * 2^attempt + jitter, max_delay)`.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        // Cap the shift so large attempt counts cannot overflow.
        let exponent = attempt.min(20);
        let exp_ms = (self.base_delay.as_millis() as u64).saturating_mul(1u64 << exponent);

        let jitter_cap = (exp_ms as f64 * self.jitter_ratio) as u64;
        let jitter = if jitter_cap == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..jitter_cap)
        };

        let max_ms = self.max_delay.as_millis() as u64;
        Duration::from_millis(exp_ms.saturating_add(jitter).min(max_ms))
    }
}

/// Lifecycle of one logical mutation. `Success` and `TerminalFailure`
/// are the only terminal states; a scheduled retry wakes back into
/// `Pending` with the attempt counter advanced.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptState {
    Pending { attempt: u32 },
    RetryScheduled { attempt: u32, delay: Duration },
    Success,
    TerminalFailure(FavoriteError),
}

impl AttemptState {
    pub fn new() -> Self {
        Self::Pending { attempt: 0 }
    }

    pub fn attempt(&self) -> Option<u32> {
        match self {
            Self::Pending { attempt } | Self::RetryScheduled { attempt, .. } => Some(*attempt),
            _ => None,
        }
    }

    /// Transition after a failed attempt: schedule a retry when the
    /// policy allows it, otherwise the failure is terminal. Terminal
    /// states are unaffected.
    pub fn on_failure(self, policy: &RetryPolicy, error: FavoriteError) -> Self {
        match self {
            Self::Pending { attempt } => {
                if policy.should_retry(&error, attempt) {
                    Self::RetryScheduled {
                        attempt,
                        delay: policy.retry_delay(attempt),
                    }
                } else {
                    Self::TerminalFailure(error)
                }
            }
            other => other,
        }
    }

    /// Transition after a successful attempt.
    pub fn on_success(self) -> Self {
        match self {
            Self::Pending { .. } => Self::Success,
            other => other,
        }
    }

    /// Wake from a scheduled retry into the next pending attempt.
    pub fn on_retry(self) -> Self {
        match self {
            Self::RetryScheduled { attempt, .. } => Self::Pending {
                attempt: attempt + 1,
            },
            other => other,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::TerminalFailure(_))
    }
}

impl Default for AttemptState {
    fn default() -> Self {
        Self::new()
    }
}
