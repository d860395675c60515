//! Error types used by the runner.
//!
//! [`RunnerError`] covers every failure the runner can report:
//!
//! - construction-time: [`RunnerError::UnsupportedPlatform`], [`RunnerError::InvalidConfiguration`];
//! - `start()`-time: [`RunnerError::SpawnFailure`];
//! - asynchronous, after the worker died too often: [`RunnerError::RetriesExhausted`];
//! - shutdown helpers: [`RunnerError::GraceExceeded`], [`RunnerError::Signal`].
//!
//! Like the event types, errors provide `as_label`/`as_message` helpers for logs and metrics.

use std::{io, path::PathBuf, time::Duration};
use thiserror::Error;

/// # Errors produced by the runner.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RunnerError {
    /// The host architecture or operating system has no worker build.
    #[error("unsupported {kind} {value:?}")]
    UnsupportedPlatform {
        /// Which lookup failed: `"architecture"` or `"platform"`.
        kind: &'static str,
        /// The host-reported value that has no mapping.
        value: String,
    },

    /// The supplied [`RunnerConfig`](crate::RunnerConfig) cannot be used.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// The worker binary could not be started (missing, not executable, ...).
    ///
    /// Returned synchronously from [`Runner::start`](crate::Runner::start); never retried.
    #[error("failed to spawn worker {binary:?}: {source}")]
    SpawnFailure {
        /// Binary that was being launched.
        binary: PathBuf,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The worker exited unexpectedly more than `max_retries` times in a row.
    #[error("worker exited unexpectedly; {retries} restart attempts exhausted")]
    RetriesExhausted {
        /// The configured retry budget that was spent.
        retries: u32,
    },

    /// The worker did not exit within the shutdown grace period.
    #[error("worker did not stop within {grace:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
    },

    /// OS signal handlers could not be installed.
    #[error("failed to install signal handler: {0}")]
    Signal(#[source] io::Error),
}

impl RunnerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use aws_verify_runner::RunnerError;
    ///
    /// let err = RunnerError::RetriesExhausted { retries: 5 };
    /// assert_eq!(err.as_label(), "retries_exhausted");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RunnerError::UnsupportedPlatform { .. } => "unsupported_platform",
            RunnerError::InvalidConfiguration { .. } => "invalid_configuration",
            RunnerError::SpawnFailure { .. } => "spawn_failure",
            RunnerError::RetriesExhausted { .. } => "retries_exhausted",
            RunnerError::GraceExceeded { .. } => "grace_exceeded",
            RunnerError::Signal(_) => "signal_handler",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RunnerError::UnsupportedPlatform { kind, value } => {
                format!("no worker build for {kind} {value:?}")
            }
            RunnerError::InvalidConfiguration { reason } => format!("config: {reason}"),
            RunnerError::SpawnFailure { binary, source } => {
                format!("spawn {}: {source}", binary.display())
            }
            RunnerError::RetriesExhausted { retries } => {
                format!("gave up after {retries} restarts")
            }
            RunnerError::GraceExceeded { grace } => format!("still running after {grace:?}"),
            RunnerError::Signal(e) => format!("signal: {e}"),
        }
    }

    /// Indicates whether the error was raised while building the runner.
    ///
    /// Construction errors leave no partial state behind; fix the input and build again.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RunnerError::UnsupportedPlatform { .. } | RunnerError::InvalidConfiguration { .. }
        )
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        RunnerError::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_platform_names_the_value() {
        let err = RunnerError::UnsupportedPlatform {
            kind: "architecture",
            value: "mips".into(),
        };
        assert_eq!(err.to_string(), "unsupported architecture \"mips\"");
        assert!(err.is_configuration());
    }

    #[test]
    fn test_messages_carry_details() {
        let err = RunnerError::RetriesExhausted { retries: 3 };
        assert_eq!(err.as_message(), "gave up after 3 restarts");

        let err = RunnerError::SpawnFailure {
            binary: PathBuf::from("/opt/av/aws-verify"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.as_message(), "spawn /opt/av/aws-verify: denied");

        let err = RunnerError::invalid("certificate #0 is empty");
        assert_eq!(err.as_message(), "config: certificate #0 is empty");
    }

    #[test]
    fn test_spawn_failure_keeps_source() {
        use std::error::Error as _;

        let err = RunnerError::SpawnFailure {
            binary: PathBuf::from("/nope/aws-verify"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(err.as_label(), "spawn_failure");
        assert!(err.source().is_some());
        assert!(!err.is_configuration());
    }
}
