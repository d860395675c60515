//! # Launching and observing worker processes.
//!
//! The runner never touches `tokio::process` directly; it goes through two traits:
//!
//! - [`Launcher`] turns a [`WorkerCommand`] into a running [`Worker`] (synchronously,
//!   so a missing binary surfaces as an error from `start()`);
//! - [`Worker`] is the handle the exit observer owns: it can be asked to terminate
//!   gracefully and awaited exactly once for its exit status.
//!
//! [`ProcessLauncher`](super::ProcessLauncher) is the production implementation.

use std::{fmt, io, process::ExitStatus};

use async_trait::async_trait;

use super::command::WorkerCommand;
use crate::events::Bus;

/// How a worker process ended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerExit {
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    /// Terminating signal, if the process was killed by one (unix only).
    pub signal: Option<i32>,
}

impl WorkerExit {
    /// Exit with the given code.
    pub const fn code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    /// Exit caused by `signal`.
    pub const fn signaled(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }

    /// `true` for exit code 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for WorkerExit {
    fn from(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit code {code}"),
            (None, Some(sig)) => write!(f, "signal {sig}"),
            (None, None) => f.write_str("unknown exit status"),
        }
    }
}

/// Which pipe a [`WorkerOutput`](crate::EventKind::WorkerOutput) line came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputStream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputStream::Stdout => "stdout",
            OutputStream::Stderr => "stderr",
        })
    }
}

/// A live worker process, exclusively owned by the runner's exit observer.
#[async_trait]
pub trait Worker: Send + 'static {
    /// OS process id, `None` once the process has been reaped.
    fn id(&self) -> Option<u32>;

    /// Asks the process to exit (SIGTERM on unix). Does not wait.
    fn terminate(&mut self) -> io::Result<()>;

    /// Waits for the process to exit.
    ///
    /// Must be cancel safe: dropping the future and calling `wait` again loses nothing.
    async fn wait(&mut self) -> io::Result<WorkerExit>;
}

/// Starts worker processes.
pub trait Launcher: Send + Sync + 'static {
    /// Spawns `cmd`. Output may be forwarded to `bus` as `WorkerOutput` events.
    ///
    /// Errors are returned synchronously (binary missing, not executable, ...).
    fn launch(&self, cmd: &WorkerCommand, bus: &Bus) -> io::Result<Box<dyn Worker>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefers_code() {
        assert_eq!(WorkerExit::code(3).to_string(), "exit code 3");
        assert_eq!(WorkerExit::signaled(15).to_string(), "signal 15");
        assert_eq!(WorkerExit::default().to_string(), "unknown exit status");
    }

    #[cfg(unix)]
    #[test]
    fn test_from_exit_status_keeps_signal() {
        use std::os::unix::process::ExitStatusExt;

        let exit = WorkerExit::from(ExitStatus::from_raw(15));
        assert_eq!(exit, WorkerExit::signaled(15));

        let exit = WorkerExit::from(ExitStatus::from_raw(2 << 8));
        assert_eq!(exit, WorkerExit::code(2));
        assert!(!exit.success());
    }
}
