//! Uniform retry policy
//!
//! Every blockhash fetch goes through [`retry_with_backoff`] with the same
//! [`RetryPolicy`]: a fixed attempt budget, linear backoff and a little
//! jitter. Permanent errors are returned immediately.

use crate::config::RetryConfig;
use crate::rpc::RpcError;
use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Errors that may go away on their own
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for RpcError {
    fn is_transient(&self) -> bool {
        self.is_retryable()
    }
}

/// Retry configuration with linear backoff and jitter
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including initial attempt)
    pub max_attempts: u32,
    /// Backoff step: the delay after attempt `n` (1-based) is `n * base_delay_ms`
    pub base_delay_ms: u64,
    /// Jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            jitter_factor: 0.1,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay_ms: config.base_delay_ms,
            jitter_factor: config.jitter_factor.clamp(0.0, 1.0),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            jitter_factor: 0.0,
        }
    }

    /// Backoff delay after a failed attempt (0-indexed)
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let linear = self.base_delay_ms as f64 * f64::from(attempt + 1);

        let jitter_range = linear * self.jitter_factor;
        let jitter = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };

        Duration::from_millis((linear + jitter).max(0.0) as u64)
    }
}

/// Retry an async operation according to `policy`.
///
/// Transient errors trigger a backoff and another attempt until the budget is
/// spent; the last error is returned. Permanent errors return immediately.
pub async fn retry_with_backoff<F, Fut, T, E>(
    operation_name: &str,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient + Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(
                        operation = operation_name,
                        attempts = attempt + 1,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) if !err.is_transient() => {
                warn!(
                    operation = operation_name,
                    error = %err,
                    "Permanent error, not retrying"
                );
                return Err(err);
            }
            Err(err) if attempt + 1 >= max_attempts => {
                warn!(
                    operation = operation_name,
                    attempts = attempt + 1,
                    error = %err,
                    "All retry attempts exhausted"
                );
                return Err(err);
            }
            Err(err) => {
                let backoff = policy.calculate_backoff(attempt);
                debug!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    max_attempts,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "Transient error, backing off before retry"
                );
                sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}
