//! Exponential backoff for callers that want to retry a failed check.
//!
//! Detection itself never retries: a failed query is returned as a typed error
//! and this helper is one way an orchestrator may act on it.
//!
//! - Default: 3 retries with 2s, 4s, 8s delays
//!
//! Only errors reporting themselves as retriable are retried; everything else
//! is returned after the first attempt.

use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::detector::DetectError;
use crate::github::GitHubApiError;

/// Errors that know whether a later attempt might succeed.
pub trait Retriable {
    fn is_retriable(&self) -> bool;
}

impl Retriable for GitHubApiError {
    fn is_retriable(&self) -> bool {
        GitHubApiError::is_retriable(self)
    }
}

impl Retriable for DetectError {
    fn is_retriable(&self) -> bool {
        DetectError::is_retriable(self)
    }
}

/// Configuration for exponential backoff retry.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt).
    pub max_retries: u32,

    /// Initial delay before the first retry.
    pub initial_delay: Duration,

    /// Maximum delay between retries (cap for exponential growth).
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (typically 2.0).
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// 3 retries with 2s, 4s, 8s delays.
    pub const DEFAULT: Self = Self {
        max_retries: 3,
        initial_delay: Duration::from_secs(2),
        max_delay: Duration::from_secs(16),
        backoff_multiplier: 2.0,
    };

    /// A single attempt, no retries.
    pub const NONE: Self = Self {
        max_retries: 0,
        initial_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
        backoff_multiplier: 1.0,
    };

    pub fn new(
        max_retries: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
            backoff_multiplier,
        }
    }

    /// Computes the delay for the given retry attempt (0-indexed).
    ///
    /// `initial_delay * backoff_multiplier^attempt`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = self.backoff_multiplier.powi(attempt as i32);
        let delay_secs = self.initial_delay.as_secs_f64() * multiplier;
        let capped_secs = delay_secs.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped_secs)
    }

    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_retries).map(|attempt| self.delay_for_attempt(attempt))
    }

    pub fn total_max_wait(&self) -> Duration {
        self.delays().sum()
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Result of a retried operation.
#[derive(Debug)]
pub enum RetryResult<T, E> {
    Success(T),

    /// A retriable error persisted through every attempt.
    ExhaustedRetries {
        last_error: E,
        /// Attempts made, including the initial one.
        attempts: u32,
    },

    /// A non-retriable error; returned on first occurrence.
    PermanentError(E),
}

impl<T, E> RetryResult<T, E> {
    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryResult::Success(v) => Ok(v),
            RetryResult::ExhaustedRetries { last_error, .. } => Err(last_error),
            RetryResult::PermanentError(e) => Err(e),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RetryResult::Success(_))
    }
}

/// Runs `operation`, sleeping and retrying while it fails with a retriable error.
///
/// Blocks the calling thread between attempts.
pub fn retry_with_backoff<T, E, F>(config: RetryConfig, mut operation: F) -> RetryResult<T, E>
where
    E: Retriable + std::fmt::Display,
    F: FnMut() -> Result<T, E>,
{
    let max_attempts = config.max_retries + 1;
    let mut attempt = 0;

    loop {
        match operation() {
            Ok(value) => return RetryResult::Success(value),
            Err(e) => {
                attempt += 1;

                if !e.is_retriable() {
                    return RetryResult::PermanentError(e);
                }
                if attempt >= max_attempts {
                    return RetryResult::ExhaustedRetries {
                        last_error: e,
                        attempts: attempt,
                    };
                }

                let delay = config.delay_for_attempt(attempt - 1);
                warn!(attempt, error = %e, delay_ms = delay.as_millis() as u64, "retrying after transient failure");
                thread::sleep(delay);
            }
        }
    }
}
