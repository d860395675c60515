//! Observable runner state.
//!
//! ```text
//!            start()                  unexpected exit (budget left)
//!   Idle ───────────► Running ─────────────────────────────► Backoff
//!    │                 │  ▲                                     │
//!    │ stop()          │  └────────── timer fires ──────────────┘
//!    │                 │ stop()                                  │ stop()
//!    ▼                 ▼                                         ▼
//!  Stopped ◄──exit── Stopping                                 Stopped
//!
//!   Running ── unexpected exit (budget spent) ──► Exhausted
//!   Stopped / Exhausted ── start() ──► Running (fresh retry budget)
//! ```

/// Lifecycle state of a [`Runner`](crate::Runner).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunnerState {
    /// Constructed, nothing spawned yet (or the last explicit start failed to spawn).
    #[default]
    Idle,
    /// A worker process is held; it may or may not be accepting connections yet.
    Running,
    /// The worker died unexpectedly; a restart is scheduled.
    Backoff,
    /// `stop()` was called and the worker has been asked to exit.
    Stopping,
    /// Stopped deliberately; no worker, no pending restart.
    Stopped,
    /// Retry budget spent; no further automatic restarts.
    Exhausted,
}

impl RunnerState {
    /// `true` for [`RunnerState::Stopped`] and [`RunnerState::Exhausted`].
    pub fn is_terminal(self) -> bool {
        matches!(self, RunnerState::Stopped | RunnerState::Exhausted)
    }

    /// Short stable label (snake_case) for logs/metrics.
    pub fn as_label(self) -> &'static str {
        match self {
            RunnerState::Idle => "idle",
            RunnerState::Running => "running",
            RunnerState::Backoff => "backoff",
            RunnerState::Stopping => "stopping",
            RunnerState::Stopped => "stopped",
            RunnerState::Exhausted => "exhausted",
        }
    }
}
