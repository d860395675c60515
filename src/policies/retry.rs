//! # Retry budget for unexpected worker exits.
//!
//! [`RetryPolicy`] decides, for the `n`-th consecutive unexpected exit, whether the
//! worker is restarted (and after which delay) or the runner gives up.
//!
//! ```text
//! retry_count ≤ max_retries → Retry { delay: backoff.delay_for(retry_count) }
//! retry_count > max_retries → Exhausted
//! ```
//!
//! With `max_retries = 3` the worker is spawned at most four times: the initial
//! start plus three restarts.

use std::time::Duration;

use super::backoff::BackoffPolicy;

/// Outcome of [`RetryPolicy::decide`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Restart the worker after `delay`.
    Retry {
        /// Backoff to wait before the restart.
        delay: Duration,
    },
    /// The budget is spent; no more automatic restarts.
    Exhausted,
}

/// Bounded restart policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of restarts in a row.
    pub max_retries: u32,
    /// Delay growth between restarts.
    pub backoff: BackoffPolicy,
}

impl Default for RetryPolicy {
    /// `max_retries = 5` with [`BackoffPolicy::default`].
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl RetryPolicy {
    /// Decides what to do after the `retry_count`-th consecutive unexpected exit (1-based).
    pub fn decide(&self, retry_count: u32) -> RetryDecision {
        if retry_count > self.max_retries {
            RetryDecision::Exhausted
        } else {
            RetryDecision::Retry {
                delay: self.backoff.delay_for(retry_count),
            }
        }
    }
}
