//! Retry logic with exponential backoff
//!
//! This module provides the retry loop used around translation calls.
//! The delay before attempt `i + 1` is `min(max_delay, 2^i)` seconds, so a
//! policy with `max_attempts = N` performs at most `N` calls separated by
//! `N - 1` sleeps. Exhausting the attempt budget is reported as
//! [`RetryFailure::Exhausted`] rather than the last error alone, because the
//! orchestrator treats it as a run outcome, not an ordinary error.
//!
//! # Example
//!
//! ```no_run
//! use novel_sync::retry::{IsRetryable, retry_with_backoff};
//! use novel_sync::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{self:?}")
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! let result = retry_with_backoff(&config, || async {
//!     // Your operation here
//!     Ok::<_, MyError>(())
//! }).await;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (network timeouts, rate limits, server busy) should return `true`.
/// Permanent failures (bad configuration, corrupt data) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

/// Implementation of IsRetryable for our Error type
impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Network errors are generally retryable
            Error::Network(e) => e.is_timeout() || e.is_connect(),
            // I/O errors can be retryable in some cases
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
            ),
            // Any single translation attempt failure is worth retrying; the
            // attempt budget bounds how long we keep trying
            Error::Translation(_) => true,
            // Backend calls have their own degradation paths (bulk to
            // individual, status query to per-chapter checks)
            Error::Backend { .. } => false,
            // Ledger errors are permanent (corrupt file, failed write)
            Error::Ledger(_) => false,
            // Parse errors are permanent for a given page snapshot
            Error::Parse(_) => false,
            // Publish failures halt the run to avoid sequence gaps
            Error::Publish(_) => false,
            // Config errors are permanent
            Error::Config { .. } => false,
            // Serialization errors are permanent
            Error::Serialization(_) => false,
            // Unknown errors - be conservative and don't retry
            Error::Other(_) => false,
        }
    }
}

/// Why a retried operation ultimately failed
#[derive(Debug)]
pub enum RetryFailure<E> {
    /// A non-retryable error surfaced; the budget was not consumed
    Fatal(E),
    /// Every attempt failed with a retryable error
    Exhausted {
        /// Number of attempts performed, including the first
        attempts: u32,
        /// Error from the final attempt
        last_error: E,
    },
}

impl<E: std::fmt::Display> std::fmt::Display for RetryFailure<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryFailure::Fatal(e) => write!(f, "{e}"),
            RetryFailure::Exhausted {
                attempts,
                last_error,
            } => {
                write!(f, "failed after {attempts} attempts: {last_error}")
            }
        }
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// Performs up to `config.max_attempts` calls in total. Sleeps
/// `min(config.max_delay, 2^i)` seconds before attempt `i + 1`, with optional
/// jitter on top. Returns the successful result, [`RetryFailure::Fatal`] for a
/// non-retryable error, or [`RetryFailure::Exhausted`] once the budget is
/// spent.
pub async fn retry_with_backoff<F, Fut, T, E>(
    config: &RetryConfig,
    mut operation: F,
) -> Result<T, RetryFailure<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt + 1 < config.max_attempts => {
                let delay = backoff_delay(attempt, config.max_delay);
                attempt += 1;

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_secs = delay.as_secs(),
                    "Operation failed, retrying"
                );

                let jittered_delay = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };

                tokio::time::sleep(jittered_delay).await;
            }
            Err(e) if e.is_retryable() => {
                tracing::error!(
                    error = %e,
                    attempts = attempt + 1,
                    "Operation failed after all retry attempts exhausted"
                );
                return Err(RetryFailure::Exhausted {
                    attempts: attempt + 1,
                    last_error: e,
                });
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "Operation failed with non-retryable error"
                );
                return Err(RetryFailure::Fatal(e));
            }
        }
    }
}

/// Delay before attempt `i + 1`: `min(cap, 2^i)` seconds
fn backoff_delay(attempt: u32, cap: Duration) -> Duration {
    // 2^i in seconds saturates rather than overflowing for huge attempt counts
    let uncapped = 1u64
        .checked_shl(attempt)
        .map(Duration::from_secs)
        .unwrap_or(cap);
    uncapped.min(cap)
}

/// Add random jitter to a delay to prevent thundering herd
///
/// Jitter is uniformly distributed between 0% and 100% of the delay,
/// so the actual delay falls between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    let jittered_secs = delay.as_secs_f64() * (1.0 + jitter_factor);
    Duration::from_secs_f64(jittered_secs)
}
