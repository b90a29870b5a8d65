//! Termination classification

use std::fmt;

use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;

use crate::error::{ProcessError, Result};

/// Normalized outcome of a finished process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Normal exit with the given code
    Exited(i32),
    /// Terminated by a signal
    Signaled { signal: Signal, core_dumped: bool },
    /// Stopped by a signal
    Stopped(Signal),
}

impl Termination {
    /// Numeric classification: exit code, terminating signal or stop signal
    pub fn code(&self) -> i32 {
        match self {
            Termination::Exited(code) => *code,
            Termination::Signaled { signal, .. } => *signal as i32,
            Termination::Stopped(signal) => *signal as i32,
        }
    }

    /// True for a normal exit with code 0
    pub fn success(&self) -> bool {
        matches!(self, Termination::Exited(0))
    }

    /// Terminating signal, if any
    pub fn signal(&self) -> Option<Signal> {
        match self {
            Termination::Signaled { signal, .. } => Some(*signal),
            _ => None,
        }
    }

    /// Classify a status reported for a child that changed state.
    ///
    /// `StillAlive` and `Continued` are not terminations; callers filter
    /// them before classifying, so they land in the unknown bucket here.
    pub(crate) fn classify(status: WaitStatus) -> Result<Self> {
        match status {
            WaitStatus::Exited(_, code) => Ok(Termination::Exited(code)),
            WaitStatus::Signaled(_, signal, core_dumped) => Ok(Termination::Signaled {
                signal,
                core_dumped,
            }),
            WaitStatus::Stopped(_, signal) => Ok(Termination::Stopped(signal)),
            other => Err(ProcessError::UnknownTermination(format!("{:?}", other))),
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Exited(code) => write!(f, "exited with code {}", code),
            Termination::Signaled {
                signal,
                core_dumped: true,
            } => write!(f, "killed by {} (core dumped)", signal),
            Termination::Signaled { signal, .. } => write!(f, "killed by {}", signal),
            Termination::Stopped(signal) => write!(f, "stopped by {}", signal),
        }
    }
}
