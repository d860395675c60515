//! Scripted launcher for state-machine tests.
//!
//! Every launch is recorded. A worker stays "alive" until the test calls
//! [`MockLauncher::crash`], the runner terminates it, or the launcher was built
//! with [`MockLauncher::crashing`], in which case it exits right away.

use std::{
    io,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    },
};

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{
    command::WorkerCommand,
    launcher::{Launcher, Worker, WorkerExit},
};
use crate::events::Bus;

type ExitSlot = Arc<Mutex<Option<oneshot::Sender<WorkerExit>>>>;

fn fire(slot: &ExitSlot, exit: WorkerExit) -> bool {
    let tx = slot.lock().unwrap().take();
    tx.map(|tx| tx.send(exit).is_ok()).unwrap_or(false)
}

#[derive(Default)]
struct Script {
    launches: Vec<WorkerCommand>,
    slots: Vec<ExitSlot>,
    fail_spawns: usize,
}

pub(crate) struct MockLauncher {
    script: Mutex<Script>,
    immediate_exit: Option<WorkerExit>,
    on_terminate: WorkerExit,
    ignore_terminate: bool,
    terminations: Arc<AtomicU32>,
    next_pid: AtomicU32,
}

impl MockLauncher {
    /// Workers live until crashed or terminated; termination reports SIGTERM.
    pub(crate) fn new() -> Self {
        Self {
            script: Mutex::new(Script::default()),
            immediate_exit: None,
            on_terminate: WorkerExit::signaled(15),
            ignore_terminate: false,
            terminations: Arc::new(AtomicU32::new(0)),
            next_pid: AtomicU32::new(1000),
        }
    }

    /// Every worker exits with `exit` as soon as it is launched.
    pub(crate) fn crashing(exit: WorkerExit) -> Self {
        Self {
            immediate_exit: Some(exit),
            ..Self::new()
        }
    }

    /// Exit status reported after `terminate()`.
    pub(crate) fn terminate_with(mut self, exit: WorkerExit) -> Self {
        self.on_terminate = exit;
        self
    }

    /// `terminate()` is recorded but the worker keeps running.
    pub(crate) fn ignoring_terminate(mut self) -> Self {
        self.ignore_terminate = true;
        self
    }

    /// The next `n` launches fail with `NotFound`.
    pub(crate) fn fail_next_spawns(&self, n: usize) {
        self.script.lock().unwrap().fail_spawns = n;
    }

    pub(crate) fn launch_count(&self) -> usize {
        self.script.lock().unwrap().launches.len()
    }

    pub(crate) fn launches(&self) -> Vec<WorkerCommand> {
        self.script.lock().unwrap().launches.clone()
    }

    pub(crate) fn terminations(&self) -> u32 {
        self.terminations.load(Ordering::SeqCst)
    }

    /// Makes worker `idx` (0-based launch order) exit with `exit`.
    pub(crate) fn crash(&self, idx: usize, exit: WorkerExit) -> bool {
        let slot = self.script.lock().unwrap().slots.get(idx).cloned();
        slot.map(|s| fire(&s, exit)).unwrap_or(false)
    }
}

impl Launcher for MockLauncher {
    fn launch(&self, cmd: &WorkerCommand, _bus: &Bus) -> io::Result<Box<dyn Worker>> {
        let mut script = self.script.lock().unwrap();
        if script.fail_spawns > 0 {
            script.fail_spawns -= 1;
            return Err(io::Error::new(io::ErrorKind::NotFound, "mock: no such binary"));
        }

        let (tx, rx) = oneshot::channel();
        let slot: ExitSlot = Arc::new(Mutex::new(Some(tx)));
        if let Some(exit) = self.immediate_exit {
            fire(&slot, exit);
        }
        script.launches.push(cmd.clone());
        script.slots.push(Arc::clone(&slot));

        Ok(Box::new(MockWorker {
            pid: self.next_pid.fetch_add(1, Ordering::SeqCst),
            rx,
            slot,
            on_terminate: (!self.ignore_terminate).then_some(self.on_terminate),
            terminations: Arc::clone(&self.terminations),
            reaped: false,
        }))
    }
}

struct MockWorker {
    pid: u32,
    rx: oneshot::Receiver<WorkerExit>,
    slot: ExitSlot,
    on_terminate: Option<WorkerExit>,
    terminations: Arc<AtomicU32>,
    reaped: bool,
}

#[async_trait]
impl Worker for MockWorker {
    fn id(&self) -> Option<u32> {
        (!self.reaped).then_some(self.pid)
    }

    fn terminate(&mut self) -> io::Result<()> {
        self.terminations.fetch_add(1, Ordering::SeqCst);
        if let Some(exit) = self.on_terminate {
            fire(&self.slot, exit);
        }
        Ok(())
    }

    async fn wait(&mut self) -> io::Result<WorkerExit> {
        let exit = (&mut self.rx)
            .await
            .map_err(|_| io::Error::other("mock worker dropped"))?;
        self.reaped = true;
        Ok(exit)
    }
}
