//! # aws-verify-runner
//!
//! **aws-verify-runner** supervises the external `aws-verify` certificate
//! verification worker.
//!
//! The worker is a prebuilt executable, one build per host operating system and
//! CPU architecture, that serves verification requests over a unix domain socket.
//! This crate picks the right build for the host, hands it a private socket path,
//! restarts it when it dies unexpectedly (with a bounded, exponentially growing
//! backoff) and stops it on request. Talking to the worker over the socket is the
//! caller's business; the runner only guarantees *someone is listening there*.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  RunnerConfig ──► RunnerBuilder::build()
//!                     ├─ validate
//!                     ├─ ResolvedIdentity { arch, platform, endpoint }
//!                     ├─ WorkerCommand  <bin_dir>/aws-verify-<version>-<platform>-<arch>
//!                     │                   -socket=<endpoint> [-certificates=a,b]
//!                     └─ Bus (+ subscriber listener)
//!
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ Runner (public handle)                                           │
//! │   start() / stop() / state() / wait_terminal() / shutdown()      │
//! └──────┬───────────────────────────────────────────────────────────┘
//!        ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ state machine (one mutex)                                        │
//! │   Idle ─► Running ─► Backoff ─► Running ... ─► Exhausted         │
//! │                  └─► Stopping ─► Stopped                         │
//! └──────┬──────────────────────────┬────────────────────────────────┘
//!        │ Launcher::launch          │ publish(Event)
//!        ▼                           ▼
//!   ProcessLauncher            Bus (broadcast) ──► SubscriberSet ──► LogWriter, ...
//!   (tokio::process,                         └──► Runner::subscribe()
//!    SIGTERM on stop)
//! ```
//!
//! ### Restart rule
//! ```text
//! unexpected exit ─► retry_count += 1
//!   ├─ retry_count > max_retries ─► Exhausted (RetriesExhausted event)
//!   └─ else sleep(min(backoff × 2^(retry_count-1), max_backoff)) ─► respawn
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                       |
//! |-------------------|----------------------------------------------------------|------------------------------------------|
//! | **Supervision**   | Start, stop, restart with backoff, graceful shutdown.    | [`Runner`], [`RunnerBuilder`]            |
//! | **Identity**      | Host → worker build, binary path, socket endpoint.       | [`ResolvedIdentity`], [`Arch`], [`Platform`] |
//! | **Policies**      | Retry budget and delay growth.                           | [`RetryPolicy`], [`BackoffPolicy`]       |
//! | **Events**        | Lifecycle stream for logging, metrics, tests.            | [`Event`], [`EventKind`], [`Subscribe`]  |
//! | **Processes**     | Pluggable launcher seam.                                 | [`Launcher`], [`Worker`], [`ProcessLauncher`] |
//! | **Errors**        | Typed construction and runtime errors.                   | [`RunnerError`]                          |
//! | **Configuration** | One struct with documented defaults.                     | [`RunnerConfig`]                         |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], which renders events through `tracing`.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use aws_verify_runner::{Runner, RunnerConfig, Subscribe};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = RunnerConfig {
//!         max_retries: 3,
//!         certificates: vec!["/etc/aws/signer.pem".into()],
//!         ..RunnerConfig::default()
//!     };
//!
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(aws_verify_runner::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn Subscribe>> = Vec::new();
//!
//!     let runner = Runner::builder(cfg).with_subscribers(subs).build()?;
//!     println!("worker listens on {}", runner.endpoint().display());
//!
//!     runner.run_until_signal().await?;
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
pub mod identity;
mod policies;
mod process;
mod subscribers;

// ---- Public re-exports ----

pub use config::{BIN_DIR_ENV, RunnerConfig, default_bin_dir};
pub use core::{Runner, RunnerBuilder, RunnerState};
pub use error::RunnerError;
pub use events::{Bus, Event, EventKind};
pub use identity::{Arch, Platform, ResolvedIdentity};
pub use policies::{BackoffPolicy, RetryDecision, RetryPolicy};
pub use process::{Launcher, OutputStream, ProcessLauncher, Worker, WorkerCommand, WorkerExit};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: built-in `tracing` subscriber.
// Enable with: `--features logging` (on by default)
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
