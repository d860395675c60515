//! Restart policies.
//!
//! This module groups the knobs that control **if** a dead worker is restarted
//! and **how long** to wait before doing so.
//!
//! ## Contents
//! - [`RetryPolicy`]   how many consecutive unexpected exits are tolerated
//! - [`BackoffPolicy`] how restart delays evolve (first / factor / max)
//!
//! ## Quick wiring
//! ```text
//! RunnerConfig { max_retries, backoff, max_backoff }
//!      └─► RunnerConfig::retry_policy() ─► RetryPolicy
//!           └─► core::machine uses decide(retry_count) on every unexpected exit
//! ```
//!
//! ## Defaults
//! - `max_retries = 5`
//! - `BackoffPolicy::default()` → first=500ms, factor=2.0, max=30s.

mod backoff;
mod retry;

pub use backoff::BackoffPolicy;
pub use retry::{RetryDecision, RetryPolicy};
