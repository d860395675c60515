//! # Runner configuration.
//!
//! [`RunnerConfig`] is supplied once, at construction, and never changes afterwards.
//!
//! Config is used in two ways:
//! 1. **Runner creation**: `Runner::new(config)` / `Runner::builder(config)`
//! 2. **Policy derivation**: [`RunnerConfig::retry_policy`] turns the retry knobs into a [`RetryPolicy`]
//!
//! ## Sentinel values
//! - `reset_after = None` → every unexpected exit counts against the budget until `start()` is called
//! - `bus_capacity = 0` → clamped to 1 by the bus
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use aws_verify_runner::RunnerConfig;
//!
//! let mut cfg = RunnerConfig::default();
//! cfg.max_retries = 3;
//! cfg.backoff = 0.25;
//! cfg.certificates = vec!["a.pem".into(), "b.pem".into()];
//!
//! assert!(cfg.validate().is_ok());
//! assert_eq!(cfg.retry_policy().backoff.first, Duration::from_millis(250));
//! ```

use std::{env, path::PathBuf, time::Duration};

use crate::error::RunnerError;
use crate::policies::{BackoffPolicy, RetryPolicy};

/// Environment variable overriding the directory that holds the worker binaries.
pub const BIN_DIR_ENV: &str = "AWS_VERIFY_BIN_DIR";

/// Configuration for a [`Runner`](crate::Runner).
///
/// ## Field semantics
/// - `max_retries`: consecutive unexpected exits tolerated before giving up
/// - `backoff`: base delay in seconds; retry `n` waits `backoff × 2^(n-1)`
/// - `max_backoff`: ceiling for a single delay
/// - `certificates`: trust material forwarded to the worker, order preserved
/// - `bin_dir` / `version`: where the worker binaries live and which build to run
/// - `temp_dir`: directory that receives the socket endpoint
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `grace`: how long signal-driven shutdown waits for the worker to exit
/// - `reset_after`: uptime after which a worker is considered healthy again
#[derive(Clone, Debug)]
pub struct RunnerConfig {
    /// Maximum number of automatic restarts after consecutive unexpected exits.
    pub max_retries: u32,

    /// Backoff factor, in seconds.
    ///
    /// Must be finite and strictly positive.
    pub backoff: f64,

    /// Upper bound for a single backoff delay.
    pub max_backoff: Duration,

    /// Trust anchors passed to the worker as `-certificates=a,b,...`.
    ///
    /// Empty means the flag is omitted and the worker falls back to its built-in certificate.
    pub certificates: Vec<PathBuf>,

    /// Directory containing the `aws-verify-<version>-<platform>-<arch>` binaries.
    pub bin_dir: PathBuf,

    /// Worker version baked into the binary name.
    pub version: String,

    /// Root directory for the socket endpoint.
    pub temp_dir: PathBuf,

    /// Capacity of the event bus broadcast channel.
    pub bus_capacity: usize,

    /// Grace period used by [`Runner::run_until_signal`](crate::Runner::run_until_signal).
    pub grace: Duration,

    /// Minimum uptime after which an exit starts a fresh retry series.
    ///
    /// - `None` = strict consecutive counting (reset only by an explicit `start()`)
    /// - `Some(d)` = a worker that ran for at least `d` is treated as healthy
    pub reset_after: Option<Duration>,
}

impl RunnerConfig {
    /// Checks the configuration and returns [`RunnerError::InvalidConfiguration`] on the first problem.
    ///
    /// Certificate paths are joined with `,` on the worker command line, so
    /// a path that is empty, not valid UTF-8, or contains a comma is rejected.
    pub fn validate(&self) -> Result<(), RunnerError> {
        if !self.backoff.is_finite() || self.backoff <= 0.0 {
            return Err(RunnerError::invalid(format!(
                "backoff must be a positive number of seconds, got {}",
                self.backoff
            )));
        }
        if self.max_backoff.is_zero() {
            return Err(RunnerError::invalid("max_backoff must be greater than zero"));
        }
        for (idx, cert) in self.certificates.iter().enumerate() {
            let Some(s) = cert.to_str() else {
                return Err(RunnerError::invalid(format!(
                    "certificate #{idx} is not valid UTF-8: {cert:?}"
                )));
            };
            if s.is_empty() {
                return Err(RunnerError::invalid(format!("certificate #{idx} is empty")));
            }
            if s.contains(',') {
                return Err(RunnerError::invalid(format!(
                    "certificate #{idx} contains ',': {s:?}"
                )));
            }
        }
        Ok(())
    }

    /// Builds the retry policy described by `max_retries`, `backoff` and `max_backoff`.
    ///
    /// Call [`validate`](Self::validate) first; an invalid `backoff` degrades to `max_backoff`.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff: BackoffPolicy::from_factor(self.backoff, self.max_backoff),
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

/// Default binary directory: `$AWS_VERIFY_BIN_DIR`, else `<manifest dir>/bin`.
pub fn default_bin_dir() -> PathBuf {
    env::var_os(BIN_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("bin"))
}

impl Default for RunnerConfig {
    /// Default configuration:
    ///
    /// - `max_retries = 5`
    /// - `backoff = 0.5s` (delays 0.5s, 1s, 2s, ...)
    /// - `max_backoff = 30s`
    /// - `certificates = []`
    /// - `bin_dir` from [`default_bin_dir`], `version` = this crate's version
    /// - `temp_dir` = system temp directory
    /// - `bus_capacity = 1024`, `grace = 10s`, `reset_after = None`
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff: 0.5,
            max_backoff: Duration::from_secs(30),
            certificates: Vec::new(),
            bin_dir: default_bin_dir(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            temp_dir: env::temp_dir(),
            bus_capacity: 1024,
            grace: Duration::from_secs(10),
            reset_after: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let cfg = RunnerConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.max_retries, 5);
        assert_eq!(cfg.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_rejects_non_positive_backoff() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let cfg = RunnerConfig {
                backoff: bad,
                ..RunnerConfig::default()
            };
            let err = cfg.validate().unwrap_err();
            assert_eq!(err.as_label(), "invalid_configuration", "backoff={bad}");
        }
    }

    #[test]
    fn test_rejects_certificate_with_comma() {
        let cfg = RunnerConfig {
            certificates: vec!["ok.pem".into(), "a,b.pem".into()],
            ..RunnerConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("#1"), "{err}");
    }

    #[test]
    fn test_rejects_empty_certificate() {
        let cfg = RunnerConfig {
            certificates: vec![PathBuf::new()],
            ..RunnerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_ceiling() {
        let cfg = RunnerConfig {
            max_backoff: Duration::ZERO,
            ..RunnerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
