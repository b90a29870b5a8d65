//! Signal delivery and status queries on a tracked pid

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use tracing::warn;

use crate::error::{ProcessError, Result};
use crate::status::Termination;

/// Deliver `signal` to `pid`.
///
/// Returns `false` when the process is already gone.
pub(crate) fn send(pid: Pid, signal: Signal) -> Result<bool> {
    match kill(pid, signal) {
        Ok(()) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        Err(source) => {
            warn!(pid = %pid, signal = %signal, error = %source, "Failed to send signal");
            Err(ProcessError::SignalFailed { signal, source })
        }
    }
}

/// Liveness probe (signal 0)
pub(crate) fn probe(pid: Pid) -> bool {
    kill(pid, None::<Signal>).is_ok()
}

/// Non-blocking status query.
///
/// `Ok(None)` while the child is still running. `Err(Errno::ECHILD)` is
/// passed through untouched so the caller can check whether another thread
/// reaped the child first.
pub(crate) fn query(pid: Pid) -> std::result::Result<Option<WaitStatus>, Errno> {
    loop {
        match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => return Ok(None),
            Ok(status) => return Ok(Some(status)),
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Block until the kernel reports that `pid` exited, was signaled or stopped.
///
/// `Ok(None)` when the child had already been reaped elsewhere.
pub(crate) fn reap_blocking(pid: Pid) -> Result<Option<Termination>> {
    let flags = WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
    loop {
        match waitpid(pid, Some(flags)) {
            Ok(
                status @ (WaitStatus::Exited(..)
                | WaitStatus::Signaled(..)
                | WaitStatus::Stopped(..)),
            ) => return Termination::classify(status).map(Some),
            Ok(_) => continue,
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => return Ok(None),
            Err(e) => return Err(ProcessError::WaitFailed(e)),
        }
    }
}
