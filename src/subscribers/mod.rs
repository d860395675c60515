//! # Event subscribers: the runner's injected observers.
//!
//! The runner publishes [`Event`](crate::Event)s on its bus; a listener task hands each
//! one to the [`SubscriberSet`], which fans it out to user-provided [`Subscribe`]
//! implementations. Logging is one such subscriber ([`LogWriter`] when the `logging`
//! feature is enabled); tests plug in recording subscribers instead.
//!
//! ```text
//! state machine ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit
//!                                                             │
//!                                              ┌──────────────┼──────────────┐
//!                                              ▼              ▼              ▼
//!                                          LogWriter       Metrics        Custom
//! ```

#[cfg(feature = "logging")]
mod embedded;
mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
