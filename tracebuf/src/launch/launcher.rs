//! Command construction and spawning for the tracing binary

#![allow(unsafe_code)] // kill() requires unsafe

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::{Child, Command};

/// Builds the command for one invocation of the tracing binary
pub trait ProcessLauncher: Send + Sync + fmt::Debug {
    /// Command running the tracing binary with `args` appended
    fn command(&self, args: &[&str]) -> Command;
}

/// Launches `<elevation...> <binary> <args...>`
///
/// With an empty elevation prefix the binary is run directly (e.g. when the
/// server itself already runs as root).
#[derive(Debug, Clone)]
pub struct ToolLauncher {
    binary: PathBuf,
    elevation: Vec<String>,
}

impl ToolLauncher {
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>, elevation: Vec<String>) -> Self {
        Self {
            binary: binary.into(),
            elevation,
        }
    }

    /// No elevation prefix
    #[must_use]
    pub fn direct(binary: impl Into<PathBuf>) -> Self {
        Self::new(binary, Vec::new())
    }
}

impl ProcessLauncher for ToolLauncher {
    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = match self.elevation.split_first() {
            Some((elevate, elevate_args)) => {
                let mut cmd = Command::new(elevate);
                cmd.args(elevate_args).arg(&self.binary);
                cmd
            }
            None => Command::new(&self.binary),
        };
        cmd.args(args);
        cmd
    }
}

/// Spawn with all three streams piped, in a fresh process group, killed if
/// the handle is dropped.
///
/// The dedicated process group lets termination reach the whole tree
/// (elevation wrapper plus the tracing binary) with one signal.
///
/// # Errors
/// Returns the spawn error (binary missing, not executable, ...)
pub fn spawn_piped(mut cmd: Command) -> io::Result<Child> {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .process_group(0);
    cmd.spawn()
}

/// Send `signal` to the process group led by `pid`
///
/// # Errors
/// Returns the OS error if no process in the group could be signalled
pub fn signal_process_group(pid: u32, signal: libc::c_int) -> io::Result<()> {
    let invalid = |message: &str| io::Error::new(io::ErrorKind::InvalidInput, message);
    let pgid = libc::pid_t::try_from(pid).map_err(|_| invalid("pid out of range"))?;
    if pgid <= 0 {
        return Err(invalid("refusing to signal pid <= 0"));
    }
    if unsafe { libc::kill(-pgid, signal) } == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}
