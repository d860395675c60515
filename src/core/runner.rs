//! # Runner: the caller-facing supervisor handle.
//!
//! A [`Runner`] owns one worker identity (binary + socket endpoint) for its whole
//! life and keeps at most one `aws-verify` process alive on that endpoint.
//!
//! ## Lifecycle
//! ```text
//! Runner::new(cfg) / Runner::builder(cfg).build()
//!     ├─ validate config
//!     ├─ resolve host → (arch, platform), allocate endpoint
//!     └─ Idle (nothing spawned)
//!
//! start()  ─► spawn worker ─► Running
//!                 │ unexpected exit
//!                 ▼
//!            retry_count += 1 ─► over budget? ─► Exhausted
//!                 │ no
//!                 ▼
//!            Backoff(delay) ─► respawn ─► Running ...
//!
//! stop()   ─► no more restarts; worker asked to exit (SIGTERM) ─► Stopped
//! drop     ─► same as stop()
//! ```
//!
//! Commands (`start`, `stop`) are synchronous and never block on the worker;
//! outcomes are observed through [`Runner::state`], [`Runner::watch_state`],
//! [`Runner::wait_terminal`] or the event stream.
//!
//! ## Example
//! ```no_run
//! use aws_verify_runner::{Runner, RunnerConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), aws_verify_runner::RunnerError> {
//!     let cfg = RunnerConfig {
//!         certificates: vec!["/etc/aws/signer.pem".into()],
//!         ..RunnerConfig::default()
//!     };
//!     let runner = Runner::new(cfg)?;
//!     println!("worker socket: {}", runner.endpoint().display());
//!
//!     runner.run_until_signal().await
//! }
//! ```

use std::{path::Path, sync::Arc, time::Duration};

use tokio::{
    sync::{broadcast, watch},
    time,
};

use super::{builder::RunnerBuilder, machine::Shared, shutdown, state::RunnerState};
use crate::{
    config::RunnerConfig,
    error::RunnerError,
    events::{Event, EventKind},
    identity::ResolvedIdentity,
};

/// Supervises one `aws-verify` worker process.
///
/// Cheap handle around shared state; dropping it stops the worker.
pub struct Runner {
    shared: Arc<Shared>,
}

impl Runner {
    /// Builder with custom subscribers, launcher or identity.
    pub fn builder(cfg: RunnerConfig) -> RunnerBuilder {
        RunnerBuilder::new(cfg)
    }

    /// Validates `cfg`, resolves the host and allocates the endpoint. Does not spawn.
    ///
    /// # Errors
    /// - [`RunnerError::InvalidConfiguration`] for a rejected config
    /// - [`RunnerError::UnsupportedPlatform`] when no worker build exists for this host
    pub fn new(cfg: RunnerConfig) -> Result<Self, RunnerError> {
        RunnerBuilder::new(cfg).build()
    }

    pub(crate) fn from_shared(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Spawns the worker if none is held.
    ///
    /// Clears a previous `stop()` and resets the retry budget. Calling it while a
    /// worker is alive is a no-op; calling it during a backoff spawns right away.
    ///
    /// Must be called within a Tokio runtime: the exit observer is a spawned task.
    ///
    /// # Errors
    /// [`RunnerError::SpawnFailure`] if the binary cannot be started; the runner stays
    /// [`Idle`](RunnerState::Idle) and the failure does not count against the budget.
    pub fn start(&self) -> Result<(), RunnerError> {
        self.shared.start()
    }

    /// Stops supervision: cancels a pending restart and asks a live worker to exit.
    ///
    /// Returns immediately. Idempotent; safe before `start()`.
    pub fn stop(&self) {
        self.shared.stop();
    }

    /// Path of the worker executable.
    pub fn binary(&self) -> &Path {
        &self.shared.command.program
    }

    /// Socket path handed to the worker; stable for the life of this runner.
    pub fn endpoint(&self) -> &Path {
        &self.shared.identity.endpoint
    }

    /// Resolved build tokens and endpoint.
    pub fn identity(&self) -> &ResolvedIdentity {
        &self.shared.identity
    }

    /// Configuration this runner was built with.
    pub fn config(&self) -> &RunnerConfig {
        &self.shared.cfg
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunnerState {
        self.shared.phase()
    }

    /// Consecutive unexpected exits since the last explicit `start()`.
    pub fn retry_count(&self) -> u32 {
        self.shared.retry_count()
    }

    /// Pid of the held worker, if any.
    pub fn pid(&self) -> Option<u32> {
        self.shared.pid()
    }

    /// Receiver for runtime events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.shared.bus.subscribe()
    }

    /// Receiver that tracks every state transition.
    pub fn watch_state(&self) -> watch::Receiver<RunnerState> {
        self.shared.watch_phase()
    }

    /// Waits until the runner is [`Stopped`](RunnerState::Stopped) or
    /// [`Exhausted`](RunnerState::Exhausted).
    ///
    /// Never completes for a runner that was neither started nor stopped.
    ///
    /// # Errors
    /// [`RunnerError::RetriesExhausted`] when the retry budget ran out.
    pub async fn wait_terminal(&self) -> Result<RunnerState, RunnerError> {
        let mut rx = self.shared.watch_phase();
        let state = match rx.wait_for(|s| s.is_terminal()).await {
            Ok(s) => *s,
            Err(_) => self.shared.phase(),
        };
        match state {
            RunnerState::Exhausted => Err(RunnerError::RetriesExhausted {
                retries: self.shared.policy.max_retries,
            }),
            other => Ok(other),
        }
    }

    /// Stops the worker and waits up to `grace` for it to exit.
    ///
    /// # Errors
    /// - [`RunnerError::GraceExceeded`] if the worker is still alive after `grace`;
    ///   the runner keeps waiting for it in the background.
    /// - [`RunnerError::RetriesExhausted`] if the runner had already given up.
    pub async fn shutdown(&self, grace: Duration) -> Result<(), RunnerError> {
        self.stop();
        match time::timeout(grace, self.wait_terminal()).await {
            Ok(Err(e)) => Err(e),
            Ok(Ok(_)) => {
                self.shared
                    .bus
                    .publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                self.shared.bus.publish(Event::new(EventKind::GraceExceeded));
                Err(RunnerError::GraceExceeded { grace })
            }
        }
    }

    /// Starts the worker and supervises it until a termination signal arrives
    /// (then shuts down within [`RunnerConfig::grace`]) or the runner reaches a
    /// terminal state on its own.
    pub async fn run_until_signal(&self) -> Result<(), RunnerError> {
        self.start()?;
        tokio::select! {
            sig = shutdown::wait_for_shutdown_signal() => match sig {
                Ok(()) => {
                    self.shared.bus.publish(Event::new(EventKind::ShutdownRequested));
                    self.shutdown(self.shared.cfg.grace).await
                }
                Err(e) => {
                    self.stop();
                    Err(RunnerError::Signal(e))
                }
            },
            res = self.wait_terminal() => res.map(|_| ()),
        }
    }
}

impl Drop for Runner {
    fn drop(&mut self) {
        self.shared.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::{ffi::OsString, fs, path::PathBuf};

    use tempfile::TempDir;

    use super::*;
    use crate::process::{WorkerExit, mock::MockLauncher};

    struct Fixture {
        runner: Runner,
        mock: Arc<MockLauncher>,
        _dir: TempDir,
    }

    fn fixture(mock: MockLauncher, cfg: RunnerConfig) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let id = ResolvedIdentity::from_host("x86_64", "linux", dir.path()).unwrap();
        let mock = Arc::new(mock);
        let cfg = RunnerConfig {
            bin_dir: PathBuf::from("/opt/av"),
            version: "1.2.3".into(),
            temp_dir: dir.path().to_path_buf(),
            ..cfg
        };
        let runner = Runner::builder(cfg)
            .with_identity(id)
            .with_launcher(mock.clone())
            .build()
            .unwrap();
        Fixture {
            runner,
            mock,
            _dir: dir,
        }
    }

    fn budget(max_retries: u32) -> RunnerConfig {
        RunnerConfig {
            max_retries,
            ..RunnerConfig::default()
        }
    }

    /// Skips events until one of `kind` arrives.
    async fn next_of(rx: &mut broadcast::Receiver<Event>, kind: EventKind) -> Event {
        loop {
            let ev = rx.recv().await.unwrap();
            if ev.kind == kind {
                return ev;
            }
        }
    }

    fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    #[tokio::test]
    async fn test_stop_before_start_is_a_clean_stop() {
        let f = fixture(MockLauncher::new(), RunnerConfig::default());
        f.runner.stop();
        f.runner.stop();

        assert_eq!(f.runner.state(), RunnerState::Stopped);
        assert_eq!(f.mock.launch_count(), 0);
        assert_eq!(f.runner.wait_terminal().await.unwrap(), RunnerState::Stopped);
    }

    #[tokio::test]
    async fn test_start_twice_spawns_once() {
        let f = fixture(MockLauncher::new(), RunnerConfig::default());
        f.runner.start().unwrap();
        f.runner.start().unwrap();

        assert_eq!(f.mock.launch_count(), 1);
        assert_eq!(f.runner.state(), RunnerState::Running);
        assert_eq!(f.runner.pid(), Some(1000));
    }

    #[tokio::test]
    async fn test_command_line_carries_socket_and_certificates() {
        let cfg = RunnerConfig {
            certificates: vec!["a.pem".into(), "b.pem".into()],
            ..RunnerConfig::default()
        };
        let f = fixture(MockLauncher::new(), cfg);
        f.runner.start().unwrap();

        let cmd = &f.mock.launches()[0];
        assert_eq!(
            cmd.program,
            Path::new("/opt/av/aws-verify-1.2.3-linux-amd64")
        );
        let mut socket = OsString::from("-socket=");
        socket.push(f.runner.endpoint());
        assert_eq!(
            cmd.args,
            vec![socket, OsString::from("-certificates=a.pem,b.pem")]
        );
    }

    #[tokio::test]
    async fn test_no_certificates_flag_without_certificates() {
        let f = fixture(MockLauncher::new(), RunnerConfig::default());
        f.runner.start().unwrap();

        let cmd = &f.mock.launches()[0];
        assert_eq!(cmd.args.len(), 1);
        assert!(cmd.args[0].to_string_lossy().starts_with("-socket="));
    }

    #[tokio::test(start_paused = true)]
    async fn test_crashing_worker_exhausts_budget_with_doubling_delays() {
        let f = fixture(MockLauncher::crashing(WorkerExit::code(1)), budget(3));
        let mut rx = f.runner.subscribe();
        f.runner.start().unwrap();

        let err = f.runner.wait_terminal().await.unwrap_err();
        assert!(matches!(err, RunnerError::RetriesExhausted { retries: 3 }));
        assert_eq!(f.runner.state(), RunnerState::Exhausted);
        assert_eq!(f.mock.launch_count(), 4);

        let events = drain(&mut rx);
        let delays: Vec<Duration> = events
            .iter()
            .filter(|e| e.kind == EventKind::BackoffScheduled)
            .filter_map(Event::delay)
            .collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(500),
                Duration::from_secs(1),
                Duration::from_secs(2)
            ]
        );

        let exhausted: Vec<_> = events
            .iter()
            .filter(|e| e.kind == EventKind::RetriesExhausted)
            .collect();
        assert_eq!(exhausted.len(), 1);
        assert_eq!(exhausted[0].attempt, Some(4));
        assert_eq!(
            exhausted[0].reason.as_deref(),
            Some("gave up after 3 restarts")
        );

        time::sleep(Duration::from_secs(600)).await;
        assert_eq!(f.mock.launch_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_backoff_cancels_restart() {
        let f = fixture(MockLauncher::crashing(WorkerExit::code(1)), budget(5));
        let mut rx = f.runner.subscribe();
        f.runner.start().unwrap();

        next_of(&mut rx, EventKind::BackoffScheduled).await;
        assert_eq!(f.runner.state(), RunnerState::Backoff);
        f.runner.stop();
        assert_eq!(f.runner.state(), RunnerState::Stopped);

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(f.mock.launch_count(), 1);
        assert_eq!(f.runner.state(), RunnerState::Stopped);
    }

    #[tokio::test]
    async fn test_stop_while_running_never_restarts() {
        let mock = MockLauncher::new().terminate_with(WorkerExit::code(1));
        let f = fixture(mock, RunnerConfig::default());
        let mut rx = f.runner.subscribe();
        f.runner.start().unwrap();

        f.runner.stop();
        assert_eq!(f.runner.state(), RunnerState::Stopping);
        assert_eq!(f.runner.wait_terminal().await.unwrap(), RunnerState::Stopped);

        let stopped = next_of(&mut rx, EventKind::WorkerStopped).await;
        assert_eq!(stopped.exit_code, Some(1));
        assert_eq!(f.mock.terminations(), 1);
        assert_eq!(f.mock.launch_count(), 1);
        assert_eq!(f.runner.retry_count(), 0);
        assert!(
            drain(&mut rx)
                .iter()
                .all(|e| e.kind != EventKind::BackoffScheduled)
        );
    }

    #[tokio::test]
    async fn test_initial_spawn_failure_is_reported_not_counted() {
        let f = fixture(MockLauncher::new(), RunnerConfig::default());
        f.mock.fail_next_spawns(1);

        let err = f.runner.start().unwrap_err();
        assert!(matches!(err, RunnerError::SpawnFailure { .. }), "{err}");
        assert_eq!(f.runner.state(), RunnerState::Idle);
        assert_eq!(f.runner.retry_count(), 0);

        f.runner.start().unwrap();
        assert_eq!(f.runner.state(), RunnerState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_spawn_failures_count_against_budget() {
        let f = fixture(MockLauncher::new(), budget(2));
        let mut rx = f.runner.subscribe();
        f.runner.start().unwrap();
        f.mock.fail_next_spawns(10);
        assert!(f.mock.crash(0, WorkerExit::code(1)));

        let err = f.runner.wait_terminal().await.unwrap_err();
        assert!(matches!(err, RunnerError::RetriesExhausted { retries: 2 }));
        assert_eq!(f.mock.launch_count(), 1);

        let failed = drain(&mut rx)
            .into_iter()
            .filter(|e| e.kind == EventKind::SpawnFailed)
            .count();
        assert_eq!(failed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_start_after_exhaustion_resets_budget() {
        let f = fixture(MockLauncher::new(), budget(1));
        let mut rx = f.runner.subscribe();
        f.runner.start().unwrap();
        next_of(&mut rx, EventKind::WorkerSpawned).await;

        f.mock.crash(0, WorkerExit::code(2));
        let respawned = next_of(&mut rx, EventKind::WorkerSpawned).await;
        assert_eq!(respawned.attempt, Some(1));

        f.mock.crash(1, WorkerExit::code(2));
        next_of(&mut rx, EventKind::RetriesExhausted).await;
        assert_eq!(f.runner.state(), RunnerState::Exhausted);
        assert_eq!(f.runner.retry_count(), 2);

        f.runner.start().unwrap();
        assert_eq!(f.runner.retry_count(), 0);
        assert_eq!(f.runner.state(), RunnerState::Running);
        assert_eq!(f.mock.launch_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_healthy_uptime_resets_retry_count() {
        let cfg = RunnerConfig {
            reset_after: Some(Duration::from_secs(10)),
            ..budget(1)
        };
        let f = fixture(MockLauncher::new(), cfg);
        let mut rx = f.runner.subscribe();
        f.runner.start().unwrap();

        for idx in 0..3 {
            next_of(&mut rx, EventKind::WorkerSpawned).await;
            time::sleep(Duration::from_secs(11)).await;
            f.mock.crash(idx, WorkerExit::signaled(9));
            let scheduled = next_of(&mut rx, EventKind::BackoffScheduled).await;
            assert_eq!(scheduled.attempt, Some(1));
        }
        assert_eq!(f.runner.retry_count(), 1);
        assert_ne!(f.runner.state(), RunnerState::Exhausted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_during_backoff_spawns_once_with_fresh_budget() {
        let f = fixture(MockLauncher::new(), budget(5));
        let mut rx = f.runner.subscribe();
        f.runner.start().unwrap();
        f.mock.crash(0, WorkerExit::code(1));

        next_of(&mut rx, EventKind::BackoffScheduled).await;
        assert_eq!(f.runner.retry_count(), 1);
        f.runner.start().unwrap();
        assert_eq!(f.runner.retry_count(), 0);
        assert_eq!(f.runner.state(), RunnerState::Running);

        time::sleep(Duration::from_secs(120)).await;
        assert_eq!(f.mock.launch_count(), 2);
        assert_eq!(f.runner.retry_count(), 0);
        assert_eq!(f.runner.state(), RunnerState::Running);
    }

    #[tokio::test]
    async fn test_stop_after_exhaustion_keeps_exhausted() {
        let f = fixture(MockLauncher::crashing(WorkerExit::code(1)), budget(0));
        let mut rx = f.runner.subscribe();
        f.runner.start().unwrap();
        assert!(f.runner.wait_terminal().await.is_err());

        f.runner.stop();
        assert_eq!(f.runner.state(), RunnerState::Exhausted);
        assert!(matches!(
            f.runner.wait_terminal().await,
            Err(RunnerError::RetriesExhausted { retries: 0 })
        ));

        let err = f.runner.shutdown(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, RunnerError::RetriesExhausted { retries: 0 }));
        assert!(
            drain(&mut rx)
                .iter()
                .all(|e| e.kind != EventKind::AllStoppedWithin)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_backoff_ceiling_still_schedules_restart() {
        let cfg = RunnerConfig {
            backoff: 1.844_674_407_370_955_2e19,
            max_backoff: Duration::MAX,
            ..budget(3)
        };
        let f = fixture(MockLauncher::new(), cfg);
        let mut rx = f.runner.subscribe();
        f.runner.start().unwrap();
        f.mock.crash(0, WorkerExit::code(1));

        let scheduled = next_of(&mut rx, EventKind::BackoffScheduled).await;
        assert_eq!(scheduled.delay_ms, Some(u32::MAX));
        assert_eq!(f.runner.state(), RunnerState::Backoff);
        assert_eq!(f.runner.pid(), None);

        f.runner.stop();
        assert_eq!(f.runner.wait_terminal().await.unwrap(), RunnerState::Stopped);
    }

    #[tokio::test]
    async fn test_dropping_the_runner_terminates_the_worker() {
        let f = fixture(MockLauncher::new(), RunnerConfig::default());
        let mut rx = f.runner.subscribe();
        f.runner.start().unwrap();

        let Fixture { runner, mock, _dir } = f;
        drop(runner);

        next_of(&mut rx, EventKind::WorkerStopped).await;
        assert_eq!(mock.terminations(), 1);
        assert_eq!(mock.launch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_reports_grace_exceeded_for_stuck_worker() {
        let f = fixture(MockLauncher::new().ignoring_terminate(), RunnerConfig::default());
        let mut rx = f.runner.subscribe();
        f.runner.start().unwrap();

        let err = f.runner.shutdown(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, RunnerError::GraceExceeded { .. }));
        assert_eq!(f.runner.state(), RunnerState::Stopping);
        next_of(&mut rx, EventKind::GraceExceeded).await;
    }

    #[tokio::test]
    async fn test_shutdown_within_grace() {
        let f = fixture(MockLauncher::new(), RunnerConfig::default());
        let mut rx = f.runner.subscribe();
        f.runner.start().unwrap();

        f.runner.shutdown(Duration::from_secs(5)).await.unwrap();
        assert_eq!(f.runner.state(), RunnerState::Stopped);
        next_of(&mut rx, EventKind::AllStoppedWithin).await;
    }

    #[tokio::test]
    async fn test_stale_endpoint_is_removed_on_spawn_and_on_stop() {
        let f = fixture(MockLauncher::new(), RunnerConfig::default());
        let endpoint = f.runner.endpoint().to_path_buf();

        fs::write(&endpoint, b"stale").unwrap();
        f.runner.start().unwrap();
        assert!(!endpoint.exists());

        fs::write(&endpoint, b"left by worker").unwrap();
        f.runner.stop();
        f.runner.wait_terminal().await.unwrap();
        assert!(!endpoint.exists());
    }
}
