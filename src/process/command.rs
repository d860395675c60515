//! Worker command line.
//!
//! The worker accepts exactly two flags:
//! - `-socket=<endpoint>` always;
//! - `-certificates=<a>,<b>,...` only when trust material was supplied.

use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
};

/// Program and arguments of one worker launch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerCommand {
    /// Absolute path to the worker binary.
    pub program: PathBuf,
    /// Arguments, in order.
    pub args: Vec<OsString>,
}

impl WorkerCommand {
    /// Builds the command for `program` listening on `endpoint` with the given trust material.
    ///
    /// # Example
    /// ```
    /// use std::path::{Path, PathBuf};
    /// use aws_verify_runner::WorkerCommand;
    ///
    /// let certs = [PathBuf::from("a.pem"), PathBuf::from("b.pem")];
    /// let cmd = WorkerCommand::new(Path::new("/bin/aws-verify"), Path::new("/tmp/1-ab.sock"), &certs);
    /// assert_eq!(cmd.args, ["-socket=/tmp/1-ab.sock", "-certificates=a.pem,b.pem"]);
    /// ```
    pub fn new(program: &Path, endpoint: &Path, certificates: &[PathBuf]) -> Self {
        let mut args = vec![flag("-socket=", [endpoint.as_os_str()])];
        if !certificates.is_empty() {
            args.push(flag(
                "-certificates=",
                certificates.iter().map(|p| p.as_os_str()),
            ));
        }
        Self {
            program: program.to_path_buf(),
            args,
        }
    }
}

fn flag<'a>(name: &str, values: impl IntoIterator<Item = &'a OsStr>) -> OsString {
    let mut out = OsString::from(name);
    for (i, v) in values.into_iter().enumerate() {
        if i > 0 {
            out.push(",");
        }
        out.push(v);
    }
    out
}
