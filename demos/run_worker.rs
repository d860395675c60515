//! # Example: run_worker
//!
//! Supervises the `aws-verify` worker until Ctrl-C / SIGTERM, logging every
//! lifecycle event through `tracing`.
//!
//! ## Flow
//! ```text
//! Runner::builder(cfg).with_subscribers([LogWriter]).build()
//!   ├─► start(): spawn <bin_dir>/aws-verify-<version>-<platform>-<arch> -socket=...
//!   ├─► worker dies → WorkerExited → BackoffScheduled(500ms, 1s, 2s ...) → respawn
//!   ├─► budget spent → RetriesExhausted → exit with error
//!   └─► SIGINT/SIGTERM → ShutdownRequested → stop() → WorkerStopped → exit
//! ```
//!
//! ## Run
//! ```bash
//! AWS_VERIFY_BIN_DIR=/opt/aws-verify/bin \
//! RUST_LOG=aws_verify_runner=debug \
//!     cargo run --example run_worker -- /etc/aws/signer.pem
//! ```

use std::{sync::Arc, time::Duration};

use aws_verify_runner::{LogWriter, Runner, RunnerConfig, Subscribe};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 1. Trust material from the command line, everything else from defaults.
    let cfg = RunnerConfig {
        certificates: std::env::args_os().skip(1).map(Into::into).collect(),
        max_retries: 3,
        grace: Duration::from_secs(5),
        ..RunnerConfig::default()
    };

    // 2. Log every event.
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let runner = Runner::builder(cfg).with_subscribers(subs).build()?;

    println!("binary:   {}", runner.binary().display());
    println!("endpoint: {}", runner.endpoint().display());

    // 3. Supervise until a signal or the retry budget runs out.
    runner.run_until_signal().await?;
    println!("final state: {}", runner.state().as_label());
    Ok(())
}
