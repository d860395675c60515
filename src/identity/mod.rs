//! Who the runner is: resolved host build, binary path and socket endpoint.
//!
//! ## Contents
//! - [`Arch`], [`Platform`] host → worker build tokens (pure lookups)
//! - [`allocate_endpoint`] unique socket path per runner instance
//! - [`binary_path`] path of the worker executable
//! - [`ResolvedIdentity`] all of the above, computed once at construction
//!
//! ```text
//! std::env::consts::{ARCH, OS} ──► Arch/Platform ──┐
//! RunnerConfig { bin_dir, version } ───────────────┼──► binary_path()
//! RunnerConfig { temp_dir } + process id ──────────┴──► allocate_endpoint()
//! ```

mod endpoint;
mod locator;
mod platform;

use std::path::{Path, PathBuf};

pub use endpoint::{TOKEN_BYTES, allocate as allocate_endpoint};
pub(crate) use endpoint::remove_stale as remove_stale_endpoint;
pub use locator::{WORKER_NAME, binary_path};
pub use platform::{Arch, Platform};

use crate::{config::RunnerConfig, error::RunnerError};

/// Build tokens and socket path of one runner instance.
///
/// Immutable after construction; the endpoint is owned by this instance for its whole life.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedIdentity {
    /// Worker architecture token.
    pub arch: Arch,
    /// Worker operating system token.
    pub platform: Platform,
    /// Socket path handed to the worker.
    pub endpoint: PathBuf,
}

impl ResolvedIdentity {
    /// Resolves the running host and allocates a fresh endpoint under `temp_dir`.
    ///
    /// Fails with [`RunnerError::UnsupportedPlatform`] if no worker build exists for this host.
    pub fn detect(temp_dir: &Path) -> Result<Self, RunnerError> {
        Ok(Self {
            arch: Arch::host()?,
            platform: Platform::host()?,
            endpoint: allocate_endpoint(temp_dir, std::process::id()),
        })
    }

    /// Same as [`detect`](Self::detect) with explicit host-reported values.
    pub fn from_host(arch: &str, os: &str, temp_dir: &Path) -> Result<Self, RunnerError> {
        Ok(Self {
            arch: Arch::resolve(arch)?,
            platform: Platform::resolve(os)?,
            endpoint: allocate_endpoint(temp_dir, std::process::id()),
        })
    }

    /// Worker binary for this identity under the configured directory and version.
    pub fn binary(&self, cfg: &RunnerConfig) -> PathBuf {
        binary_path(&cfg.bin_dir, &cfg.version, self.platform, self.arch)
    }
}
