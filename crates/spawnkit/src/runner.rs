//! One-shot synchronous runs

use crate::{
    capture::Capture, config::ProcessConfig, error::Result, process::Process,
    status::Termination,
};

/// Result of a capturing run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    /// How the child finished
    pub status: Termination,
    /// Bytes written to stdout
    pub stdout: Vec<u8>,
    /// Bytes written to stderr (empty unless captured)
    pub stderr: Vec<u8>,
}

/// Run `command` to completion, discarding its output
///
/// # Examples
/// ```no_run
/// let status = spawnkit::run("true", Vec::<String>::new())?;
/// assert!(status.success());
/// # Ok::<(), spawnkit::ProcessError>(())
/// ```
pub fn run<I, S>(command: &str, args: I) -> Result<Termination>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    run_with(command, args, Capture::NONE).map(|output| output.status)
}

/// Run `command` to completion, capturing stdout only
pub fn run_stdout<I, S>(command: &str, args: I) -> Result<Output>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    run_with(command, args, Capture::OUT)
}

/// Run `command` to completion, capturing stdout and stderr
///
/// # Examples
/// ```no_run
/// let output = spawnkit::run_output("echo", ["42"])?;
/// assert_eq!(output.stdout, b"42\n");
/// # Ok::<(), spawnkit::ProcessError>(())
/// ```
pub fn run_output<I, S>(command: &str, args: I) -> Result<Output>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    run_with(command, args, Capture::OUT | Capture::ERR)
}

fn run_with<I, S>(command: &str, args: I, capture: Capture) -> Result<Output>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    run_config(ProcessConfig::new(command).args(args).capture(capture))
}

/// Spawn a process from `config` and wait for it with the configured budget
pub(crate) fn run_config(config: ProcessConfig) -> Result<Output> {
    let capture = config.capture;
    let mut process = Process::from_config(config);
    process.run()?;

    let status = process.wait()?;

    // The wait loop already flushed everything into the buffers.
    let stdout = if capture.contains(Capture::OUT) {
        process.read_all_stdout()
    } else {
        Vec::new()
    };
    let stderr = if capture.contains(Capture::ERR) {
        process.read_all_stderr()
    } else {
        Vec::new()
    };

    Ok(Output {
        status,
        stdout,
        stderr,
    })
}
