//! Tokio-backed worker launcher.
//!
//! Spawns the worker with stdin closed and stdout/stderr piped. Each pipe is
//! drained by a small task that republishes every line as a
//! [`WorkerOutput`](crate::EventKind::WorkerOutput) event; the tasks end on EOF.

use std::{io, process::Stdio};

use async_trait::async_trait;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::{Child, Command},
};

use super::{
    command::WorkerCommand,
    launcher::{Launcher, OutputStream, Worker, WorkerExit},
};
use crate::events::{Bus, Event, EventKind};

/// Launches real worker processes via [`tokio::process`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    fn launch(&self, cmd: &WorkerCommand, bus: &Bus) -> io::Result<Box<dyn Worker>> {
        let mut child = Command::new(&cmd.program)
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false)
            .spawn()?;

        let pid = child.id();
        if let Some(out) = child.stdout.take() {
            forward_lines(out, OutputStream::Stdout, pid, bus.clone());
        }
        if let Some(err) = child.stderr.take() {
            forward_lines(err, OutputStream::Stderr, pid, bus.clone());
        }
        Ok(Box::new(ProcessWorker { child }))
    }
}

fn forward_lines<R>(reader: R, stream: OutputStream, pid: Option<u32>, bus: Bus)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            bus.publish(
                Event::new(EventKind::WorkerOutput)
                    .with_pid(pid)
                    .with_stream(stream)
                    .with_reason(line),
            );
        }
    });
}

struct ProcessWorker {
    child: Child,
}

#[async_trait]
impl Worker for ProcessWorker {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn terminate(&mut self) -> io::Result<()> {
        // `id()` is `None` once the child was reaped, so a recycled pid is never signalled.
        match self.child.id() {
            Some(pid) => send_terminate(&mut self.child, pid),
            None => Ok(()),
        }
    }

    async fn wait(&mut self) -> io::Result<WorkerExit> {
        self.child.wait().await.map(WorkerExit::from)
    }
}

#[cfg(unix)]
fn send_terminate(_child: &mut Child, pid: u32) -> io::Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let pid = i32::try_from(pid).map_err(|_| io::Error::other("pid out of range"))?;
    kill(Pid::from_raw(pid), Signal::SIGTERM).map_err(io::Error::from)
}

#[cfg(not(unix))]
fn send_terminate(child: &mut Child, _pid: u32) -> io::Result<()> {
    child.start_kill()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::{ffi::OsString, path::PathBuf, time::Duration};

    fn sh(script: &str) -> WorkerCommand {
        WorkerCommand {
            program: PathBuf::from("sh"),
            args: vec![OsString::from("-c"), OsString::from(script)],
        }
    }

    #[tokio::test]
    async fn test_spawn_forwards_output() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();

        let mut worker = ProcessLauncher
            .launch(&sh("echo hello; echo oops 1>&2"), &bus)
            .unwrap();
        assert!(worker.id().is_some());
        assert!(worker.wait().await.unwrap().success());

        let mut seen = Vec::new();
        while seen.len() < 2 {
            let ev = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("output event")
                .unwrap();
            assert_eq!(ev.kind, EventKind::WorkerOutput);
            seen.push((ev.stream.unwrap(), ev.reason.unwrap().to_string()));
        }
        seen.sort_by_key(|(s, _)| *s == OutputStream::Stderr);
        assert_eq!(seen[0], (OutputStream::Stdout, "hello".to_string()));
        assert_eq!(seen[1], (OutputStream::Stderr, "oops".to_string()));
    }

    #[tokio::test]
    async fn test_terminate_sends_sigterm() {
        let bus = Bus::new(4);
        let mut worker = ProcessLauncher.launch(&sh("exec sleep 30"), &bus).unwrap();

        worker.terminate().unwrap();
        let exit = worker.wait().await.unwrap();
        assert_eq!(exit, WorkerExit::signaled(15));

        // Reaped: terminating again is a no-op.
        assert!(worker.id().is_none());
        assert!(worker.terminate().is_ok());
    }

    #[tokio::test]
    async fn test_spawn_missing_binary_fails() {
        let bus = Bus::new(4);
        let cmd = WorkerCommand {
            program: PathBuf::from("/nonexistent/aws-verify-0.0.0-linux-amd64"),
            args: Vec::new(),
        };
        let err = ProcessLauncher.launch(&cmd, &bus).err().expect("spawn error");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
