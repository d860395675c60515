//! # LogWriter: events as `tracing` records
//!
//! Renders incoming [`Event`]s through the `tracing` macros so the host application
//! decides where they go (install any `tracing` subscriber). Worker stderr lines are
//! logged at `warn`, exhaustion at `error`, routine lifecycle at `info`/`debug`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  aws_verify_runner: worker spawned pid=4812 attempt=0
//! WARN  aws_verify_runner: worker exited unexpectedly pid=4812 exit_code=2 retry=1
//! INFO  aws_verify_runner: restart scheduled retry=1 delay_ms=500
//! ERROR aws_verify_runner: giving up on worker retry=6 reason="..."
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::process::OutputStream;
use crate::subscribers::Subscribe;

const TARGET: &str = "aws_verify_runner";

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::WorkerStarting => {
                debug!(target: TARGET, attempt = e.attempt, "starting worker");
            }
            EventKind::WorkerSpawned => {
                info!(target: TARGET, pid = e.pid, attempt = e.attempt, "worker spawned");
            }
            EventKind::WorkerOutput => match e.stream {
                Some(OutputStream::Stderr) => {
                    warn!(target: TARGET, pid = e.pid, "worker: {reason}");
                }
                _ => info!(target: TARGET, pid = e.pid, "worker: {reason}"),
            },
            EventKind::WorkerExited => {
                warn!(
                    target: TARGET,
                    pid = e.pid,
                    exit_code = e.exit_code,
                    signal = e.signal,
                    retry = e.attempt,
                    "worker exited unexpectedly"
                );
            }
            EventKind::WorkerStopped => {
                info!(
                    target: TARGET,
                    pid = e.pid,
                    exit_code = e.exit_code,
                    signal = e.signal,
                    "worker stopped"
                );
            }
            EventKind::SpawnFailed => {
                warn!(target: TARGET, retry = e.attempt, reason, "restart failed to spawn");
            }
            EventKind::BackoffScheduled => {
                info!(target: TARGET, retry = e.attempt, delay_ms = e.delay_ms, "restart scheduled");
            }
            EventKind::RetriesExhausted => {
                error!(target: TARGET, retry = e.attempt, reason, "giving up on worker");
            }
            EventKind::StopRequested => debug!(target: TARGET, "stop requested"),
            EventKind::TerminateFailed => {
                warn!(target: TARGET, pid = e.pid, reason, "could not signal worker");
            }
            EventKind::EndpointCleanupFailed => {
                warn!(target: TARGET, reason, "could not remove worker socket");
            }
            EventKind::ShutdownRequested => info!(target: TARGET, "shutdown requested"),
            EventKind::AllStoppedWithin => info!(target: TARGET, "worker stopped within grace"),
            EventKind::GraceExceeded => warn!(target: TARGET, "worker did not stop within grace"),
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                warn!(target: TARGET, reason, "subscriber problem");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
