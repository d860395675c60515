//! # Runtime events emitted by the runner.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Worker lifecycle**: starting, spawned, output, exited, stopped
//! - **Recovery**: spawn failures, scheduled backoff, exhausted budget
//! - **Shutdown**: stop/shutdown requests and their outcome
//! - **Subscriber health**: overflow and panics in user subscribers
//!
//! The [`Event`] struct carries the metadata (pid, attempt, delay, exit status, ...).
//!
//! ## Ordering guarantees
//! Each event has a process-wide sequence number (`seq`) that increases monotonically.
//! Events about one worker are published in lifecycle order:
//! `WorkerStarting → WorkerSpawned → WorkerExited | WorkerStopped`. `WorkerOutput`
//! lines come from separate reader tasks and may trail the exit event.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use aws_verify_runner::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::BackoffScheduled)
//!     .with_attempt(2)
//!     .with_delay(Duration::from_secs(1))
//!     .with_reason("exit code 1");
//!
//! assert_eq!(ev.kind, EventKind::BackoffScheduled);
//! assert_eq!(ev.delay_ms, Some(1000));
//! assert_eq!(ev.reason.as_deref(), Some("exit code 1"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::process::{OutputStream, WorkerExit};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Worker lifecycle ===
    /// A spawn is about to be issued.
    ///
    /// Sets:
    /// - `attempt`: 0 for an explicit `start()`, else the retry number
    WorkerStarting,

    /// The worker process is running.
    ///
    /// Sets:
    /// - `pid`: OS process id (if known)
    /// - `attempt`
    WorkerSpawned,

    /// One line written by the worker.
    ///
    /// Sets:
    /// - `pid`
    /// - `stream`: stdout or stderr
    /// - `reason`: the line, without trailing newline
    WorkerOutput,

    /// The worker exited without a prior `stop()`.
    ///
    /// Sets:
    /// - `pid`
    /// - `exit_code` / `signal`: whichever the OS reported
    /// - `attempt`: consecutive unexpected exits so far
    WorkerExited,

    /// The worker exited after `stop()`; no restart follows.
    ///
    /// Sets:
    /// - `pid`
    /// - `exit_code` / `signal`
    WorkerStopped,

    // === Recovery ===
    /// An automatic restart could not spawn the binary.
    ///
    /// Sets:
    /// - `attempt`: retry number
    /// - `reason`: spawn error
    SpawnFailed,

    /// A restart is scheduled.
    ///
    /// Sets:
    /// - `attempt`: retry number of the upcoming restart
    /// - `delay_ms`: delay before it
    BackoffScheduled,

    /// Consecutive unexpected exits exceeded `max_retries`; the runner gave up.
    ///
    /// Sets:
    /// - `attempt`: the retry number that exceeded the budget
    /// - `reason`: error message
    RetriesExhausted,

    // === Shutdown ===
    /// `stop()` was called.
    StopRequested,

    /// The termination signal could not be delivered (the worker may already be gone).
    ///
    /// Sets:
    /// - `pid`
    /// - `reason`: io error
    TerminateFailed,

    /// The socket file left behind could not be removed.
    ///
    /// Sets:
    /// - `reason`: io error
    EndpointCleanupFailed,

    /// Shutdown requested (OS signal observed).
    ShutdownRequested,

    /// The worker stopped within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; the worker did not exit in time.
    GraceExceeded,

    // === Subscriber health ===
    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `reason`: `subscriber=<name> reason=<full|closed>`
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `reason`: panic info/message
    SubscriberPanicked,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Worker process id.
    pub pid: Option<u32>,
    /// Attempt/retry number (see [`EventKind`] for meaning per kind).
    pub attempt: Option<u32>,
    /// Backoff delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Exit code, when the worker exited normally.
    pub exit_code: Option<i32>,
    /// Terminating signal, when the worker was killed by one.
    pub signal: Option<i32>,
    /// Output stream of a [`EventKind::WorkerOutput`] line.
    pub stream: Option<OutputStream>,
    /// Human-readable reason (errors, output line, overflow details, ...).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            pid: None,
            attempt: None,
            delay_ms: None,
            exit_code: None,
            signal: None,
            stream: None,
            reason: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Sets the worker pid (`None` clears it).
    #[inline]
    pub fn with_pid(mut self, pid: Option<u32>) -> Self {
        self.pid = pid;
        self
    }

    /// Attaches an attempt number.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a backoff delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches the exit status of a worker.
    #[inline]
    pub fn with_exit(mut self, exit: &WorkerExit) -> Self {
        self.exit_code = exit.code;
        self.signal = exit.signal;
        self
    }

    /// Attaches the output stream of a worker line.
    #[inline]
    pub fn with_stream(mut self, stream: OutputStream) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Backoff delay as a [`Duration`].
    pub fn delay(&self) -> Option<Duration> {
        self.delay_ms.map(|ms| Duration::from_millis(u64::from(ms)))
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} panic={info}"))
    }

    /// Whether this event ends the runner's life (stopped or exhausted).
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::WorkerStopped | EventKind::RetriesExhausted
        )
    }
}
