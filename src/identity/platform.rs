//! # Host architecture / OS → worker build naming.
//!
//! The worker is distributed as one binary per Go `GOOS`/`GOARCH` pair. This module maps
//! the values the host reports (Rust's `std::env::consts` names as well as the common
//! aliases used by other toolchains) to those tokens.
//!
//! | host arch                        | token   |
//! |----------------------------------|---------|
//! | `x86`, `i386`, `i686`, `ia32`    | `386`   |
//! | `x86_64`, `x64`, `amd64`         | `amd64` |
//! | `arm`                            | `arm`   |
//! | `aarch64`, `arm64`               | `arm64` |
//!
//! | host OS             | token    |
//! |---------------------|----------|
//! | `linux`             | `linux`  |
//! | `macos`, `darwin`   | `darwin` |
//!
//! Tables are immutable constants; lookups are pure and safe from any thread.

use std::fmt;

use crate::error::RunnerError;

/// Canonical CPU architecture token of a worker build.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Arch {
    /// 32-bit x86 (`386`).
    X86,
    /// 64-bit x86 (`amd64`).
    Amd64,
    /// 32-bit ARM (`arm`).
    Arm,
    /// 64-bit ARM (`arm64`).
    Arm64,
}

/// Canonical operating system token of a worker build.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Platform {
    /// `linux`
    Linux,
    /// `darwin`
    Darwin,
}

const ARCH_TABLE: &[(&str, Arch)] = &[
    ("x86", Arch::X86),
    ("i386", Arch::X86),
    ("i686", Arch::X86),
    ("ia32", Arch::X86),
    ("x86_64", Arch::Amd64),
    ("x64", Arch::Amd64),
    ("amd64", Arch::Amd64),
    ("arm", Arch::Arm),
    ("aarch64", Arch::Arm64),
    ("arm64", Arch::Arm64),
];

const PLATFORM_TABLE: &[(&str, Platform)] = &[
    ("linux", Platform::Linux),
    ("macos", Platform::Darwin),
    ("darwin", Platform::Darwin),
];

impl Arch {
    /// Token used in the worker binary name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Arch::X86 => "386",
            Arch::Amd64 => "amd64",
            Arch::Arm => "arm",
            Arch::Arm64 => "arm64",
        }
    }

    /// Maps a host-reported architecture string.
    pub fn resolve(host: &str) -> Result<Self, RunnerError> {
        lookup(ARCH_TABLE, host).ok_or_else(|| RunnerError::UnsupportedPlatform {
            kind: "architecture",
            value: host.to_string(),
        })
    }

    /// Architecture of the running process.
    pub fn host() -> Result<Self, RunnerError> {
        Self::resolve(std::env::consts::ARCH)
    }
}

impl Platform {
    /// Token used in the worker binary name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Darwin => "darwin",
        }
    }

    /// Maps a host-reported operating system string.
    pub fn resolve(host: &str) -> Result<Self, RunnerError> {
        lookup(PLATFORM_TABLE, host).ok_or_else(|| RunnerError::UnsupportedPlatform {
            kind: "platform",
            value: host.to_string(),
        })
    }

    /// Operating system of the running process.
    pub fn host() -> Result<Self, RunnerError> {
        Self::resolve(std::env::consts::OS)
    }
}

fn lookup<T: Copy>(table: &[(&str, T)], key: &str) -> Option<T> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
