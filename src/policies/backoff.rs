//! # Backoff policy for worker restarts.
//!
//! [`BackoffPolicy`] controls how restart delays grow after repeated unexpected exits.
//! It is parameterized by:
//! - [`BackoffPolicy::first`] the delay before the first restart;
//! - [`BackoffPolicy::factor`] the multiplicative growth factor;
//! - [`BackoffPolicy::max`] the maximum delay cap.
//!
//! The delay for retry `n` (1-based) is `first × factor^(n-1)`, clamped to `max`.
//! The base is derived from the retry number alone, so the sequence is
//! monotonically non-decreasing whenever `factor >= 1.0`.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use aws_verify_runner::BackoffPolicy;
//!
//! let backoff = BackoffPolicy::from_factor(0.5, Duration::from_secs(30));
//!
//! assert_eq!(backoff.delay_for(1), Duration::from_millis(500));
//! assert_eq!(backoff.delay_for(2), Duration::from_secs(1));
//! assert_eq!(backoff.delay_for(3), Duration::from_secs(2));
//!
//! // 0.5s × 2^19 ≈ 73h → capped
//! assert_eq!(backoff.delay_for(20), Duration::from_secs(30));
//! ```

use std::time::Duration;

/// Growth factor used by [`BackoffPolicy::from_factor`].
pub const DOUBLING: f64 = 2.0;

/// Restart backoff policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first restart.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` keeps delays non-decreasing).
    pub factor: f64,
}

impl Default for BackoffPolicy {
    /// `first = 500ms`, `factor = 2.0`, `max = 30s`.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(500),
            max: Duration::from_secs(30),
            factor: DOUBLING,
        }
    }
}

impl BackoffPolicy {
    /// Doubling backoff starting at `seconds`, capped at `max`.
    ///
    /// A non-finite or negative `seconds` starts directly at `max`.
    pub fn from_factor(seconds: f64, max: Duration) -> Self {
        let first = if seconds.is_finite() && seconds >= 0.0 {
            Duration::try_from_secs_f64(seconds).unwrap_or(max).min(max)
        } else {
            max
        };
        Self {
            first,
            max,
            factor: DOUBLING,
        }
    }

    /// Computes the delay before restart number `retry` (1-based).
    ///
    /// `retry = 0` is treated as `1`. Overflow and non-finite intermediate
    /// values clamp to [`BackoffPolicy::max`].
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        if !secs.is_finite() || secs < 0.0 {
            return self.max;
        }
        // `as_secs_f64` rounds a ceiling near `Duration::MAX` up, so compare as `Duration`.
        Duration::try_from_secs_f64(secs).map_or(self.max, |d| d.min(self.max))
    }
}
