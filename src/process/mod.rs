//! Worker processes: command line, launcher seam, tokio implementation.
//!
//! ## Contents
//! - [`WorkerCommand`] program + `-socket=` / `-certificates=` arguments
//! - [`Launcher`], [`Worker`] the seam between the state machine and the OS
//! - [`ProcessLauncher`] spawns real processes via `tokio::process`
//! - [`WorkerExit`], [`OutputStream`] what the runner learns about a worker

mod command;
mod launcher;
mod spawner;

#[cfg(test)]
pub(crate) mod mock;

pub use command::WorkerCommand;
pub use launcher::{Launcher, OutputStream, Worker, WorkerExit};
pub use spawner::ProcessLauncher;
