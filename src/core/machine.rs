//! # Supervision state machine.
//!
//! [`Shared`] is the state every asynchronous piece of the runner works on: the
//! caller-facing [`Runner`](crate::Runner), one exit observer task per spawned worker,
//! and at most one live backoff timer. All transitions happen under a single mutex
//! that is never held across an `.await`.
//!
//! ## Flow
//! ```text
//! start() ──► spawn_locked() ──► Launcher::launch() ──► tokio::spawn(observe)
//!                                                            │
//!                     stop token cancelled ─► terminate()    │
//!                                                            ▼
//!                                              on_exit(generation, status)
//!                                                 ├─ stop_requested ─► Stopped
//!                                                 └─ unexpected:
//!                                                      retry_count += 1
//!                                                      ├─ over budget ─► Exhausted
//!                                                      └─ Backoff: sleep(delay) ─► retry()
//!                                                                                   └─► spawn_locked()
//! ```
//!
//! ## Rules
//! - At most one worker is held; `start()` with a held worker is a no-op.
//! - Each observer reports exactly once, tagged with its spawn generation.
//! - `stop_requested` is re-checked under the lock right before every spawn,
//!   so a timer that fires after `stop()` never spawns.
//! - An explicit `start()` clears `stop_requested` and resets `retry_count`.

use std::{
    io,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::{
    sync::watch,
    time::{self, Instant},
};
use tokio_util::sync::{CancellationToken, DropGuard};

use super::state::RunnerState;
use crate::{
    config::RunnerConfig,
    error::RunnerError,
    events::{Bus, Event, EventKind},
    identity::{ResolvedIdentity, remove_stale_endpoint},
    policies::{RetryDecision, RetryPolicy},
    process::{Launcher, Worker, WorkerCommand, WorkerExit},
};

/// The worker currently owned by the runner.
struct Held {
    generation: u64,
    pid: Option<u32>,
    stop: CancellationToken,
    spawned_at: Instant,
}

#[derive(Default)]
struct MachineState {
    phase: RunnerState,
    stop_requested: bool,
    retry_count: u32,
    generation: u64,
    child: Option<Held>,
    backoff: Option<CancellationToken>,
}

pub(crate) struct Shared {
    pub(crate) cfg: RunnerConfig,
    pub(crate) identity: ResolvedIdentity,
    pub(crate) command: WorkerCommand,
    pub(crate) policy: RetryPolicy,
    pub(crate) bus: Bus,
    launcher: Arc<dyn Launcher>,
    state: Mutex<MachineState>,
    phase_tx: watch::Sender<RunnerState>,
    _listener: Option<DropGuard>,
}

impl Shared {
    pub(crate) fn new(
        cfg: RunnerConfig,
        identity: ResolvedIdentity,
        command: WorkerCommand,
        bus: Bus,
        launcher: Arc<dyn Launcher>,
        listener: Option<DropGuard>,
    ) -> Arc<Self> {
        let (phase_tx, _rx) = watch::channel(RunnerState::Idle);
        Arc::new(Self {
            policy: cfg.retry_policy(),
            cfg,
            identity,
            command,
            bus,
            launcher,
            state: Mutex::new(MachineState::default()),
            phase_tx,
            _listener: listener,
        })
    }

    fn lock(&self) -> MutexGuard<'_, MachineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn phase(&self) -> RunnerState {
        self.lock().phase
    }

    pub(crate) fn retry_count(&self) -> u32 {
        self.lock().retry_count
    }

    pub(crate) fn pid(&self) -> Option<u32> {
        self.lock().child.as_ref().and_then(|h| h.pid)
    }

    pub(crate) fn watch_phase(&self) -> watch::Receiver<RunnerState> {
        self.phase_tx.subscribe()
    }

    fn set_phase(&self, st: &mut MachineState, phase: RunnerState) {
        st.phase = phase;
        self.phase_tx.send_replace(phase);
    }

    /// Explicit, caller-driven start.
    pub(crate) fn start(self: &Arc<Self>) -> Result<(), RunnerError> {
        let mut st = self.lock();
        if st.child.is_some() {
            return Ok(());
        }
        st.stop_requested = false;
        st.retry_count = 0;
        if let Some(timer) = st.backoff.take() {
            timer.cancel();
        }

        let res = self.spawn_locked(&mut st, 0);
        if res.is_err() {
            self.set_phase(&mut st, RunnerState::Idle);
        }
        res
    }

    /// Deliberate stop: sticky until the next explicit `start()`.
    pub(crate) fn stop(&self) {
        let mut st = self.lock();
        st.stop_requested = true;
        if let Some(timer) = st.backoff.take() {
            timer.cancel();
        }
        self.bus.publish(Event::new(EventKind::StopRequested));

        if let Some(held) = st.child.as_ref() {
            held.stop.cancel();
            self.set_phase(&mut st, RunnerState::Stopping);
        } else if st.phase != RunnerState::Exhausted {
            self.finish(&mut st, RunnerState::Stopped);
        }
    }

    fn spawn_locked(
        self: &Arc<Self>,
        st: &mut MachineState,
        attempt: u32,
    ) -> Result<(), RunnerError> {
        if st.stop_requested || st.child.is_some() {
            return Ok(());
        }
        self.bus
            .publish(Event::new(EventKind::WorkerStarting).with_attempt(attempt));

        let spawn_err = |source: io::Error| RunnerError::SpawnFailure {
            binary: self.command.program.clone(),
            source,
        };
        remove_stale_endpoint(&self.identity.endpoint).map_err(spawn_err)?;
        let worker = self
            .launcher
            .launch(&self.command, &self.bus)
            .map_err(spawn_err)?;

        st.generation += 1;
        let pid = worker.id();
        let stop = CancellationToken::new();
        st.child = Some(Held {
            generation: st.generation,
            pid,
            stop: stop.clone(),
            spawned_at: Instant::now(),
        });
        self.set_phase(st, RunnerState::Running);
        self.bus.publish(
            Event::new(EventKind::WorkerSpawned)
                .with_pid(pid)
                .with_attempt(attempt),
        );

        tokio::spawn(observe(Arc::clone(self), st.generation, worker, stop));
        Ok(())
    }

    fn on_exit(self: &Arc<Self>, generation: u64, res: io::Result<WorkerExit>) {
        let mut st = self.lock();
        let held = match st.child.take() {
            Some(h) if h.generation == generation => h,
            other => {
                st.child = other;
                return;
            }
        };
        let (exit, wait_error) = match res {
            Ok(exit) => (exit, None),
            Err(e) => (WorkerExit::default(), Some(e.to_string())),
        };

        if st.stop_requested {
            self.bus.publish(
                Event::new(EventKind::WorkerStopped)
                    .with_pid(held.pid)
                    .with_exit(&exit),
            );
            self.finish(&mut st, RunnerState::Stopped);
            return;
        }

        if let Some(healthy) = self.cfg.reset_after {
            if held.spawned_at.elapsed() >= healthy {
                st.retry_count = 0;
            }
        }
        st.retry_count = st.retry_count.saturating_add(1);

        let mut ev = Event::new(EventKind::WorkerExited)
            .with_pid(held.pid)
            .with_exit(&exit)
            .with_attempt(st.retry_count);
        if let Some(reason) = wait_error {
            ev = ev.with_reason(reason);
        }
        self.bus.publish(ev);
        self.schedule_retry(&mut st);
    }

    fn schedule_retry(self: &Arc<Self>, st: &mut MachineState) {
        match self.policy.decide(st.retry_count) {
            RetryDecision::Exhausted => {
                let err = RunnerError::RetriesExhausted {
                    retries: self.policy.max_retries,
                };
                self.bus.publish(
                    Event::new(EventKind::RetriesExhausted)
                        .with_attempt(st.retry_count)
                        .with_reason(err.as_message()),
                );
                self.finish(st, RunnerState::Exhausted);
            }
            RetryDecision::Retry { delay } => {
                let timer = CancellationToken::new();
                st.backoff = Some(timer.clone());
                self.set_phase(st, RunnerState::Backoff);
                self.bus.publish(
                    Event::new(EventKind::BackoffScheduled)
                        .with_attempt(st.retry_count)
                        .with_delay(delay),
                );

                let shared = Arc::clone(self);
                tokio::spawn(async move {
                    tokio::select! {
                        _ = time::sleep(delay) => shared.retry(&timer),
                        _ = timer.cancelled() => {}
                    }
                });
            }
        }
    }

    fn retry(self: &Arc<Self>, timer: &CancellationToken) {
        let mut st = self.lock();
        if timer.is_cancelled() || st.stop_requested || st.child.is_some() {
            return;
        }
        st.backoff = None;

        let attempt = st.retry_count;
        if let Err(err) = self.spawn_locked(&mut st, attempt) {
            self.bus.publish(
                Event::new(EventKind::SpawnFailed)
                    .with_attempt(attempt)
                    .with_reason(err.as_message()),
            );
            st.retry_count = st.retry_count.saturating_add(1);
            self.schedule_retry(&mut st);
        }
    }

    /// Enters a terminal phase and releases the endpoint.
    fn finish(&self, st: &mut MachineState, phase: RunnerState) {
        if let Some(timer) = st.backoff.take() {
            timer.cancel();
        }
        if let Err(e) = remove_stale_endpoint(&self.identity.endpoint) {
            self.bus.publish(
                Event::new(EventKind::EndpointCleanupFailed)
                    .with_reason(format!("{}: {e}", self.identity.endpoint.display())),
            );
        }
        self.set_phase(st, phase);
    }
}

/// Exit observer: owns the worker until it exits, then reports exactly once.
async fn observe(
    shared: Arc<Shared>,
    generation: u64,
    mut worker: Box<dyn Worker>,
    stop: CancellationToken,
) {
    let exited = tokio::select! {
        res = worker.wait() => Some(res),
        _ = stop.cancelled() => None,
    };
    let res = match exited {
        Some(res) => res,
        None => {
            if let Err(e) = worker.terminate() {
                shared.bus.publish(
                    Event::new(EventKind::TerminateFailed)
                        .with_pid(worker.id())
                        .with_reason(e.to_string()),
                );
            }
            worker.wait().await
        }
    };
    shared.on_exit(generation, res);
}
