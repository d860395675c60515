use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::{CancellationToken, DropGuard};

use super::{machine::Shared, runner::Runner};
use crate::{
    config::RunnerConfig,
    error::RunnerError,
    events::Bus,
    identity::ResolvedIdentity,
    process::{Launcher, ProcessLauncher, WorkerCommand},
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Runner`] with optional collaborators.
pub struct RunnerBuilder {
    cfg: RunnerConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    launcher: Option<Arc<dyn Launcher>>,
    identity: Option<ResolvedIdentity>,
}

impl RunnerBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: RunnerConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            launcher: None,
            identity: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (spawns, exits, restarts, ...)
    /// through dedicated workers with bounded queues. A non-empty list
    /// requires [`build`](Self::build) to run inside a Tokio runtime.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Replaces the process launcher (defaults to [`ProcessLauncher`]).
    pub fn with_launcher(mut self, launcher: Arc<dyn Launcher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// Uses a pre-resolved identity instead of detecting the host.
    pub fn with_identity(mut self, identity: ResolvedIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Validates the configuration, resolves the identity and assembles the runner.
    ///
    /// Nothing is spawned; the runner starts [`Idle`](crate::RunnerState::Idle).
    pub fn build(self) -> Result<Runner, RunnerError> {
        let Self {
            cfg,
            subscribers,
            launcher,
            identity,
        } = self;
        cfg.validate()?;

        let identity = match identity {
            Some(id) => id,
            None => ResolvedIdentity::detect(&cfg.temp_dir)?,
        };
        let command = WorkerCommand::new(
            &identity.binary(&cfg),
            &identity.endpoint,
            &cfg.certificates,
        );

        let bus = Bus::new(cfg.bus_capacity_clamped());
        let listener = (!subscribers.is_empty()).then(|| subscriber_listener(subscribers, &bus));
        let launcher = launcher.unwrap_or_else(|| Arc::new(ProcessLauncher) as Arc<dyn Launcher>);

        let shared = Shared::new(cfg, identity, command, bus, launcher, listener);
        Ok(Runner::from_shared(shared))
    }
}

/// Forwards bus events to the subscriber set until the guard is dropped.
fn subscriber_listener(subscribers: Vec<Arc<dyn Subscribe>>, bus: &Bus) -> DropGuard {
    let set = SubscriberSet::new(subscribers, bus.clone());
    let mut rx = bus.subscribe();
    let token = CancellationToken::new();
    let cancelled = token.clone();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                ev = rx.recv() => match ev {
                    Ok(ev) => set.emit(ev),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                },
                _ = cancelled.cancelled() => break,
            }
        }
        set.shutdown().await;
    });
    token.drop_guard()
}
