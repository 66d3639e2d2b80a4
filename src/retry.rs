//! Bounded exponential backoff for transient failures
//!
//! Used at the two I/O boundaries: blob reads and model calls. Permanent
//! failures are returned on first sight; transient ones are retried up to
//! `max_retries` times with `base_delay * 2^attempt` (capped, jittered).

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::observability::Logger;

/// Retry bounds for one kind of I/O
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 = try once)
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

/// Why a retried operation gave up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// Every attempt failed transiently
    Exhausted {
        /// Total attempts made
        attempts: u32,
        /// Error from the final attempt
        last: E,
    },
    /// A non-transient failure; not retried
    Permanent(E),
}

impl<E> RetryError<E> {
    /// The underlying error, whichever way the retry ended
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Permanent(e) => e,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Policy with `max_retries` and no delay between attempts
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (0-based), without jitter
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    fn jittered(&self, retry: u32) -> Duration {
        let delay = self.backoff(retry);
        if delay.is_zero() {
            return delay;
        }
        // Up to +25% so synchronized callers spread out
        let spread = delay.as_millis() as u64 / 4;
        let extra = rand::thread_rng().gen_range(0..=spread);
        (delay + Duration::from_millis(extra)).min(self.max_delay)
    }

    /// Runs `attempt` until it succeeds, fails permanently, or the retry
    /// budget is spent. `attempt` receives the 0-based attempt number.
    pub async fn run<T, E, F, Fut>(
        &self,
        operation: &str,
        is_transient: impl Fn(&E) -> bool,
        mut attempt: F,
    ) -> Result<T, RetryError<E>>
    where
        E: std::fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut number = 0u32;
        loop {
            match attempt(number).await {
                Ok(value) => return Ok(value),
                Err(e) if !is_transient(&e) => return Err(RetryError::Permanent(e)),
                Err(e) if number >= self.max_retries => {
                    let attempts = (number + 1).to_string();
                    Logger::warn(
                        "RETRY_EXHAUSTED",
                        &[
                            ("attempts", &attempts),
                            ("error", &e.to_string()),
                            ("operation", operation),
                        ],
                    );
                    return Err(RetryError::Exhausted {
                        attempts: number + 1,
                        last: e,
                    });
                }
                Err(e) => {
                    let delay = self.jittered(number);
                    let retry = (number + 1).to_string();
                    let delay_ms = delay.as_millis().to_string();
                    Logger::warn(
                        "RETRY_SCHEDULED",
                        &[
                            ("delay_ms", &delay_ms),
                            ("error", &e.to_string()),
                            ("operation", operation),
                            ("retry", &retry),
                        ],
                    );
                    tokio::time::sleep(delay).await;
                    number += 1;
                }
            }
        }
    }
}
