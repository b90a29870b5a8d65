//! Child creation with piped standard streams

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io;
use std::os::fd::AsRawFd;
use std::path::Path;
use std::process::{ChildStderr, ChildStdin, ChildStdout, Command, Stdio};

use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::waitpid;
use nix::unistd::Pid;
use tracing::{debug, info};

use crate::error::Result;

/// Everything the parent keeps from a successful spawn
#[derive(Debug)]
pub(crate) struct Spawned {
    pub pid: Pid,
    pub stdin: ChildStdin,
    pub stdout: ChildStdout,
    pub stderr: ChildStderr,
}

/// What to launch
#[derive(Debug)]
pub(crate) struct Launch<'a> {
    pub command: &'a str,
    pub args: &'a [String],
    pub environment: &'a BTreeMap<OsString, OsString>,
    pub working_dir: Option<&'a Path>,
}

/// Spawn the child with all three standard streams bound to fresh pipes.
///
/// The child-side ends are closed in the parent once the child runs, and the
/// stdout/stderr read ends are switched to non-blocking mode. On any failure
/// every descriptor opened here is released and no child is left behind.
pub(crate) fn spawn(launch: &Launch<'_>) -> Result<Spawned> {
    debug!(
        command = %launch.command,
        args = ?launch.args,
        "Spawning process"
    );

    let mut cmd = Command::new(launch.command);
    cmd.args(launch.args)
        .env_clear()
        .envs(launch.environment)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    if let Some(dir) = launch.working_dir {
        cmd.current_dir(dir);
    }

    let mut child = cmd.spawn()?;
    let pid = Pid::from_raw(child.id() as i32);

    let pipes = (child.stdin.take(), child.stdout.take(), child.stderr.take());
    // The entity reaps through waitpid on the raw pid from here on.
    drop(child);

    let (stdin, stdout, stderr) = match pipes {
        (Some(stdin), Some(stdout), Some(stderr)) => (stdin, stdout, stderr),
        _ => {
            abort(pid);
            return Err(io::Error::new(io::ErrorKind::Other, "child pipes were not created").into());
        }
    };

    if let Err(e) = set_nonblocking(&stdout).and_then(|_| set_nonblocking(&stderr)) {
        abort(pid);
        return Err(e.into());
    }

    info!(pid = %pid, command = %launch.command, "Process spawned");

    Ok(Spawned {
        pid,
        stdin,
        stdout,
        stderr,
    })
}

/// Switch a descriptor to non-blocking mode
pub(crate) fn set_nonblocking(fd: &impl AsRawFd) -> io::Result<()> {
    let raw = fd.as_raw_fd();
    let flags = fcntl(raw, FcntlArg::F_GETFL).map_err(io::Error::from)?;
    let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
    fcntl(raw, FcntlArg::F_SETFL(flags)).map_err(io::Error::from)?;
    Ok(())
}

/// Kill and reap a child whose setup could not be completed
fn abort(pid: Pid) {
    let _ = kill(pid, Signal::SIGKILL);
    let _ = waitpid(pid, None);
}
