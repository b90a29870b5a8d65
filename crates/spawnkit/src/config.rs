//! Process configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::capture::Capture;

/// Default interval between two status polls of the wait loop
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default pause before an accessor performs its final drain
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Configuration for spawning a process
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    /// Executable command, resolved through `PATH`
    pub command: String,
    /// Command arguments
    pub args: Vec<String>,
    /// Environment overrides layered on the snapshot of the parent environment
    pub env: Vec<(String, String)>,
    /// Working directory (None = current dir)
    pub working_dir: Option<PathBuf>,
    /// Streams kept by the manager
    pub capture: Capture,
    /// Budget for `Process::wait` (None = unbounded)
    pub wait_timeout: Option<Duration>,
    /// Sleep between two wait loop ticks
    pub poll_interval: Duration,
    /// Pause before an accessor drains the pipe one last time
    pub settle_delay: Duration,
}

impl ProcessConfig {
    /// Create new process configuration
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: vec![],
            env: vec![],
            working_dir: None,
            capture: Capture::default(),
            wait_timeout: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    /// Set command arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Append a single argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Set working directory
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Select captured streams
    pub fn capture(mut self, capture: Capture) -> Self {
        self.capture = capture;
        self
    }

    /// Set the default wait budget
    pub fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = Some(timeout);
        self
    }

    /// Set the wait loop tick
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the accessor settle delay
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProcessConfig::new("echo");
        assert_eq!(config.command, "echo");
        assert!(config.args.is_empty());
        assert_eq!(config.capture, Capture::default());
        assert_eq!(config.wait_timeout, None);
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn test_builder_chain() {
        let config = ProcessConfig::new("sh")
            .args(["-c", "true"])
            .arg("extra")
            .env("FOO", "bar")
            .capture(Capture::OUT)
            .wait_timeout(Duration::from_secs(3))
            .poll_interval(Duration::from_millis(10));

        assert_eq!(config.args, vec!["-c", "true", "extra"]);
        assert_eq!(config.env, vec![("FOO".to_string(), "bar".to_string())]);
        assert_eq!(config.capture, Capture::OUT);
        assert_eq!(config.wait_timeout, Some(Duration::from_secs(3)));
        assert_eq!(config.poll_interval, Duration::from_millis(10));
    }
}
