//! Retry execution with exponential backoff.
//!
//! Failures are classified before each retry decision: non-retryable
//! categories stop immediately, everything else backs off and tries again
//! until the policy's budget is spent.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::errors::GenerationError;
use crate::failure::{classify, FailureCategory};

/// Lower bound of the jitter factor.
pub const JITTER_MIN: f64 = 0.8;
/// Upper bound of the jitter factor.
pub const JITTER_MAX: f64 = 1.2;

/// Back-off configuration.
///
/// Holds no mutable state; attempt counting lives in each
/// [`RetryExecutor::run`] invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound for any single delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Growth factor between consecutive delays.
    pub backoff_multiplier: f64,
    /// Perturb each delay by a uniform factor in `[0.8, 1.2]`.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay_ms: 1000,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Creates the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::default().with_max_retries(0)
    }

    /// Sets the retry budget.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the initial delay.
    #[must_use]
    pub const fn with_initial_delay_ms(mut self, delay: u64) -> Self {
        self.initial_delay_ms = delay;
        self
    }

    /// Sets the delay cap.
    #[must_use]
    pub const fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub const fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enables or disables jitter.
    #[must_use]
    pub const fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Total calls allowed, including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retrying after the given failed attempt (1-based).
    ///
    /// `min(max_delay, initial_delay * multiplier^(attempt - 1))`, then
    /// scaled by the jitter factor when enabled.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        clippy::cast_possible_wrap
    )]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let raw = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped = raw.min(self.max_delay_ms as f64).max(0.0);

        let delay = if self.jitter {
            capped * rand::thread_rng().gen_range(JITTER_MIN..=JITTER_MAX)
        } else {
            capped
        };

        Duration::from_millis(delay.round() as u64)
    }
}

/// Information passed to the retry hook before each back-off.
#[derive(Debug, Clone, Copy)]
pub struct RetryNotice<'a> {
    /// The attempt that just failed (1-based).
    pub attempt: u32,
    /// Wait before the next attempt.
    pub delay: Duration,
    /// Category of the failure.
    pub category: FailureCategory,
    /// The failure.
    pub error: &'a GenerationError,
}

/// Result of a retried operation.
#[derive(Debug, Clone)]
pub struct RetryOutcome<T> {
    /// Whether some attempt succeeded.
    pub success: bool,
    /// The successful value.
    pub result: Option<T>,
    /// The most recent attempt's error, on failure.
    pub error: Option<GenerationError>,
    /// Classification of `error`.
    pub category: Option<FailureCategory>,
    /// Total calls made.
    pub attempts: u32,
    /// Back-off delays actually waited, in order.
    pub delays: Vec<Duration>,
}

impl<T> RetryOutcome<T> {
    /// Converts into a plain `Result`.
    pub fn into_result(self) -> Result<T, GenerationError> {
        match (self.result, self.error) {
            (Some(value), _) => Ok(value),
            (None, Some(error)) => Err(error),
            (None, None) => Err(GenerationError::execution(
                "Operation produced neither a value nor an error",
            )),
        }
    }
}

/// Runs operations under a [`RetryPolicy`].
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Creates an executor for the given policy.
    #[must_use]
    pub const fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Returns the policy.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `operation` until it succeeds, fails non-retryably, or the
    /// attempt budget is exhausted.
    pub async fn run<T, F, Fut>(&self, operation: F) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GenerationError>>,
    {
        self.run_with_hook(operation, |_| {}).await
    }

    /// Like [`run`](Self::run), calling `on_retry` before each back-off.
    pub async fn run_with_hook<T, F, Fut, H>(&self, mut operation: F, mut on_retry: H) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GenerationError>>,
        H: FnMut(RetryNotice<'_>),
    {
        let max_attempts = self.policy.max_attempts();
        let mut delays = Vec::new();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match operation().await {
                Ok(value) => {
                    return RetryOutcome {
                        success: true,
                        result: Some(value),
                        error: None,
                        category: None,
                        attempts: attempt,
                        delays,
                    };
                }
                Err(error) => error,
            };

            let classification = classify(&error);

            if !classification.is_retryable || attempt >= max_attempts {
                tracing::debug!(
                    attempt,
                    category = %classification.category,
                    retryable = classification.is_retryable,
                    error = %error,
                    "Giving up"
                );
                return RetryOutcome {
                    success: false,
                    result: None,
                    error: Some(error),
                    category: Some(classification.category),
                    attempts: attempt,
                    delays,
                };
            }

            let delay = self.policy.delay_for(attempt);
            tracing::debug!(
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                category = %classification.category,
                error = %error,
                "Retrying after error"
            );
            on_retry(RetryNotice {
                attempt,
                delay,
                category: classification.category,
                error: &error,
            });

            tokio::time::sleep(delay).await;
            delays.push(delay);
        }
    }
}

/// Runs `operation` under `policy`, returning a plain `Result`.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation: F) -> Result<T, GenerationError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GenerationError>>,
{
    RetryExecutor::new(policy.clone())
        .run(operation)
        .await
        .into_result()
}
