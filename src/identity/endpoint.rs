//! # Socket endpoint allocation.
//!
//! Produces `<tempdir>/<pid>-<32 hex chars>.sock`. The token is 16 bytes drawn from
//! [`rand::rng`], a CSPRNG reseeded from the OS, so another local process cannot
//! predict the path and pre-create or hijack the socket. With 128 bits of entropy
//! no collision check is performed.

use std::{
    io,
    path::{Path, PathBuf},
};

use rand::RngCore;

/// Number of random bytes in an endpoint token.
pub const TOKEN_BYTES: usize = 16;

/// Returns a fresh, unpredictable socket path under `temp_dir` for process `pid`.
pub fn allocate(temp_dir: &Path, pid: u32) -> PathBuf {
    let mut token = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut token);
    temp_dir.join(format!("{pid}-{}.sock", hex::encode(token)))
}

/// Removes a leftover socket file at `path`.
///
/// A worker that crashed does not unlink its socket and the next listen on the same
/// path would fail. A missing file is not an error.
pub(crate) fn remove_stale(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
