//! Retry policy with exponential backoff.
//!
//! Wraps a single unreliable call. Errors classified as retryable (rate
//! limiting) are retried after a growing delay until the attempt ceiling is
//! reached; every other error fails immediately.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Retry policy for unreliable external calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including first try)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay between retries in milliseconds
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Maximum delay between retries in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Backoff multiplier (delay *= multiplier after each retry)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_initial_delay() -> u64 {
    2000
}
fn default_max_delay() -> u64 {
    30000
}
fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

/// Errors that know whether they are worth retrying
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Terminal outcome of a retried call
#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("retries exhausted after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },

    #[error("{0}")]
    Fatal(E),
}

/// Per-call bookkeeping, discarded once the call settles
#[derive(Debug, Clone, Copy)]
struct RetryState {
    attempt: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Calculate delay for a specific attempt (1-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::from_millis(self.initial_delay_ms.min(self.max_delay_ms));
        }

        let delay = self.initial_delay_ms as f64
            * self.backoff_multiplier.powi((attempt - 1) as i32);

        let capped = delay.min(self.max_delay_ms as f64) as u64;
        Duration::from_millis(capped)
    }

    /// Check if we should retry based on attempt count
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Run `operation` until it succeeds, fails fatally, or runs out of attempts
    pub async fn execute<T, E, F, Fut>(&self, mut operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let mut state = RetryState {
            attempt: 0,
            delay: self.delay_for_attempt(1),
        };

        loop {
            state.attempt += 1;

            let error = match operation().await {
                Ok(value) => {
                    if state.attempt > 1 {
                        debug!(attempt = state.attempt, "Call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if !error.is_retryable() {
                return Err(RetryError::Fatal(error));
            }

            if !self.should_retry(state.attempt) {
                warn!(attempts = state.attempt, error = %error, "Retries exhausted");
                return Err(RetryError::Exhausted {
                    attempts: state.attempt,
                    last: error,
                });
            }

            warn!(
                attempt = state.attempt,
                delay_ms = state.delay.as_millis() as u64,
                error = %error,
                "Call failed, retrying"
            );

            tokio::time::sleep(state.delay).await;
            state.delay = self.delay_for_attempt(state.attempt + 1);
        }
    }
}
