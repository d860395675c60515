//! # Worker binary path composition.
//!
//! `<base>/aws-verify-<version>-<platform>-<arch>`. Pure string composition:
//! whether the file exists is only discovered when it is spawned.

use std::path::{Path, PathBuf};

use super::platform::{Arch, Platform};

/// Base name of the distributed worker executables.
pub const WORKER_NAME: &str = "aws-verify";

/// Returns the path to the worker build for `platform`/`arch` in `base`.
///
/// # Example
/// ```
/// use std::path::Path;
/// use aws_verify_runner::identity::{binary_path, Arch, Platform};
///
/// let p = binary_path(Path::new("/opt/bin"), "1.2.0", Platform::Linux, Arch::Amd64);
/// assert_eq!(p, Path::new("/opt/bin/aws-verify-1.2.0-linux-amd64"));
/// ```
pub fn binary_path(base: &Path, version: &str, platform: Platform, arch: Arch) -> PathBuf {
    base.join(format!("{WORKER_NAME}-{version}-{platform}-{arch}"))
}
