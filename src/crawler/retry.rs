//! Retry policy for failed downloads
//!
//! An [`Asset`](super::Asset) never retries by itself. After a failed attempt
//! the registry asks the [`RetryPolicy`] what to do next:
//!
//! - [`RetryStrategy::Bounded`] retries transient failures until the attempt
//!   ceiling is reached (the default)
//! - [`RetryStrategy::Unbounded`] retries transient failures forever; opt-in
//! - [`RetryStrategy::Manual`] never retries; failed assets stay failed until
//!   `Registry::resubmit` is called
//!
//! Permanent failures (see [`DownloadError::is_permanent`]) are never retried.

use crate::config::{RetryConfig, RetryMode};
use crate::DownloadError;
use std::time::Duration;
use tracing::debug;

/// Default maximum attempts, including the first one
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);
const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// How many times a failed download may be attempted again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStrategy {
    /// At most `max_attempts` attempts in total
    Bounded { max_attempts: u32 },
    /// No ceiling
    Unbounded,
    /// No automatic retries
    Manual,
}

/// Decision on whether to retry a failed download
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after `delay`; `attempt` is the number of the upcoming attempt
    Retry { delay: Duration, attempt: u32 },

    /// Give up
    DoNotRetry { reason: String },
}

/// Retry strategy plus exponential backoff
///
/// ```text
/// delay(n) = min(base_delay * multiplier^(n - 1), max_delay)
/// ```
/// where `n` is the number of the attempt that just failed.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    strategy: RetryStrategy,
    base_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            strategy: RetryStrategy::Bounded {
                max_attempts: DEFAULT_MAX_ATTEMPTS,
            },
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with explicit settings
    pub fn new(
        strategy: RetryStrategy,
        base_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        let strategy = match strategy {
            RetryStrategy::Bounded { max_attempts } => RetryStrategy::Bounded {
                max_attempts: max_attempts.max(1),
            },
            other => other,
        };

        Self {
            strategy,
            base_delay,
            max_delay: max_delay.max(base_delay),
            backoff_multiplier: backoff_multiplier.max(1.0),
        }
    }

    /// Builds the policy described by the `[retry]` config section
    pub fn from_config(config: &RetryConfig) -> Self {
        let strategy = match config.strategy {
            RetryMode::Bounded => RetryStrategy::Bounded {
                max_attempts: config.max_attempts,
            },
            RetryMode::Unbounded => RetryStrategy::Unbounded,
            RetryMode::Manual => RetryStrategy::Manual,
        };

        Self::new(
            strategy,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
            config.backoff_multiplier,
        )
    }

    /// A policy that never retries automatically
    pub fn manual() -> Self {
        Self {
            strategy: RetryStrategy::Manual,
            ..Self::default()
        }
    }

    /// Returns the configured strategy
    pub fn strategy(&self) -> RetryStrategy {
        self.strategy
    }

    /// Returns the backoff before the attempt after `failed_attempt`
    pub fn delay_for(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(64) as i32;
        let nanos = self.base_delay.as_nanos() as f64 * self.backoff_multiplier.powi(exponent);

        if !nanos.is_finite() || nanos >= self.max_delay.as_nanos() as f64 {
            self.max_delay
        } else {
            Duration::from_nanos(nanos.round() as u64)
        }
    }

    /// Decides what happens after attempt number `attempt` (1-indexed) failed
    pub fn should_retry(&self, error: &DownloadError, attempt: u32) -> RetryDecision {
        if error.is_permanent() {
            return RetryDecision::DoNotRetry {
                reason: format!("permanent failure: {}", error),
            };
        }

        match self.strategy {
            RetryStrategy::Manual => RetryDecision::DoNotRetry {
                reason: "automatic retries disabled".to_string(),
            },
            RetryStrategy::Bounded { max_attempts } if attempt >= max_attempts => {
                RetryDecision::DoNotRetry {
                    reason: format!("gave up after {} attempts", attempt),
                }
            }
            RetryStrategy::Bounded { .. } | RetryStrategy::Unbounded => {
                let delay = self.delay_for(attempt);
                debug!(attempt, ?delay, "scheduling retry");
                RetryDecision::Retry {
                    delay,
                    attempt: attempt + 1,
                }
            }
        }
    }
}
