//! Error types for process management

use std::io;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::Signal;
use thiserror::Error;

/// Process management errors
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Failed to create pipes or launch the child
    #[error("Failed to spawn process: {0}")]
    SpawnFailed(#[from] io::Error),

    /// `run` was called on an entity that has already been spawned
    #[error("Process already started (PID: {pid})")]
    AlreadyStarted { pid: u32 },

    /// `wait` was called on an entity that was never spawned
    #[error("Process was never started")]
    NotStarted,

    /// The status query itself failed
    #[error("Failed to query process status: {0}")]
    WaitFailed(Errno),

    /// Polling budget exhausted while the child is still running
    #[error("Process timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// Exit status matched none of the recognized termination forms
    #[error("Unknown process termination: {0}")]
    UnknownTermination(String),

    /// Invalid configuration
    #[error("Invalid process configuration: {0}")]
    InvalidConfig(String),

    /// Signal delivery failed
    #[error("Failed to send {signal} to process: {source}")]
    SignalFailed { signal: Signal, source: Errno },

    /// Blocking worker of the async manager could not be joined
    #[error("Process worker failed: {0}")]
    Join(String),
}

impl ProcessError {
    /// Whether this error leaves the process running and tracked
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProcessError::Timeout { .. })
    }
}

/// Result type for process operations
pub type Result<T> = std::result::Result<T, ProcessError>;
