//! Runtime core: the supervision state machine and its public handle.
//!
//! The public API from this module is [`Runner`] (plus [`RunnerBuilder`] and
//! [`RunnerState`]).
//!
//! Internal modules:
//! - [`machine`]: shared state, spawn/exit/backoff transitions under one lock;
//! - [`runner`]: caller-facing commands, queries and graceful shutdown;
//! - [`builder`]: validation, identity resolution, subscriber wiring;
//! - [`shutdown`]: cross-platform termination signals.

mod builder;
mod machine;
mod runner;
mod shutdown;
mod state;

pub use builder::RunnerBuilder;
pub use runner::Runner;
pub use state::RunnerState;
