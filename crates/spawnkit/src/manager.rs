//! Process manager - async façade for tokio callers
//!
//! The lifecycle core is synchronous; blocking operations run on tokio's
//! blocking pool so async tasks never stall on a wait loop or a reap.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::{self, JoinError};
use tracing::{debug, warn};

use crate::{
    config::ProcessConfig,
    error::{ProcessError, Result},
    process::Process,
    runner::{self, Output},
    status::Termination,
};

/// Manages process lifecycle from async code
#[derive(Debug)]
pub struct ProcessManager;

impl ProcessManager {
    /// Create new process manager
    pub fn new() -> Self {
        Self
    }

    /// Spawn a managed process
    ///
    /// # Examples
    /// ```no_run
    /// use spawnkit::{ProcessConfig, ProcessManager};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let manager = ProcessManager::new();
    /// let process = manager.spawn(ProcessConfig::new("echo").args(["hello"]))?;
    /// let status = manager.wait(process).await?;
    /// assert!(status.success());
    /// # Ok(())
    /// # }
    /// ```
    pub fn spawn(&self, config: ProcessConfig) -> Result<Arc<Process>> {
        let mut process = Process::from_config(config);
        process.run()?;
        Ok(Arc::new(process))
    }

    /// Wait for a process using its configured budget
    pub async fn wait(&self, process: Arc<Process>) -> Result<Termination> {
        task::spawn_blocking(move || process.wait())
            .await
            .map_err(join_error)?
    }

    /// Spawn, wait and collect the captured output in one go
    pub async fn output(&self, config: ProcessConfig) -> Result<Output> {
        task::spawn_blocking(move || runner::run_config(config))
            .await
            .map_err(join_error)?
    }

    /// Interrupt a process, escalating to SIGKILL once `grace` has passed
    ///
    /// # Examples
    /// ```no_run
    /// use std::time::Duration;
    /// use spawnkit::{ProcessConfig, ProcessManager};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let manager = ProcessManager::new();
    /// let process = manager.spawn(ProcessConfig::new("sleep").args(["1000"]))?;
    /// manager.shutdown(process, Duration::from_millis(200)).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn shutdown(&self, process: Arc<Process>, grace: Duration) -> Result<()> {
        if process.pid().is_none() {
            return Ok(());
        }

        debug!(pid = ?process.pid(), "Shutting down process");

        let interrupting = {
            let process = Arc::clone(&process);
            task::spawn_blocking(move || process.interrupt())
        };

        match tokio::time::timeout(grace, interrupting).await {
            Ok(joined) => joined.map_err(join_error)?,
            Err(_) => {
                warn!(pid = ?process.pid(), "Process ignored SIGINT, sending SIGKILL");
                // The pending interrupt returns once the kill lands.
                task::spawn_blocking(move || process.kill())
                    .await
                    .map_err(join_error)?
            }
        }
    }
}

impl Default for ProcessManager {
    fn default() -> Self {
        Self::new()
    }
}

fn join_error(e: JoinError) -> ProcessError {
    ProcessError::Join(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::signal::Signal;

    #[tokio::test]
    async fn test_spawn_echo() {
        let manager = ProcessManager::new();
        let config = ProcessConfig::new("echo")
            .args(["hello"])
            .poll_interval(Duration::from_millis(10));

        let process = manager.spawn(config).unwrap();
        assert!(process.pid().unwrap() > 0);
        assert!(manager.wait(process).await.unwrap().success());
    }

    #[tokio::test]
    async fn test_output() {
        let manager = ProcessManager::new();
        let config = ProcessConfig::new("sh")
            .args(["-c", "echo hi; echo there >&2"])
            .settle_delay(Duration::ZERO);

        let output = manager.output(config).await.unwrap();
        assert_eq!(output.stdout, b"hi\n");
        assert_eq!(output.stderr, b"there\n");
    }

    #[tokio::test]
    async fn test_shutdown() {
        let manager = ProcessManager::new();
        let process = manager.spawn(ProcessConfig::new("sleep").args(["10"])).unwrap();

        manager
            .shutdown(Arc::clone(&process), Duration::from_secs(2))
            .await
            .unwrap();
        assert!(!process.exists());
        assert_eq!(process.wait().unwrap().signal(), Some(Signal::SIGINT));
    }

    #[tokio::test]
    async fn test_shutdown_escalates() {
        let manager = ProcessManager::new();
        let config = ProcessConfig::new("sh").args(["-c", "trap '' INT; sleep 10"]);
        let process = manager.spawn(config).unwrap();
        // Let the shell install its trap before signaling.
        tokio::time::sleep(Duration::from_millis(200)).await;

        manager
            .shutdown(Arc::clone(&process), Duration::from_millis(200))
            .await
            .unwrap();
        assert!(!process.exists());
        assert_eq!(process.wait().unwrap().signal(), Some(Signal::SIGKILL));
    }
}
