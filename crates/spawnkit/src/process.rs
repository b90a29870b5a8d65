//! Managed child process

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::process::ChildStdin;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::unistd::Pid;
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::{
    capture::Capture,
    config::ProcessConfig,
    drain::{Channel, Streams},
    error::{ProcessError, Result},
    signal,
    spawn::{self, Launch},
    status::Termination,
};

/// Pause between attempts to take the reaping lock
const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(1);

/// One spawned (or not yet spawned) child process.
///
/// Setup (`add_argument`, `set_env_var`, `run`) takes `&mut self`. Once the
/// child runs, the entity can be shared across threads: one thread may sit in
/// [`Process::wait`] while others read the captured output, write to stdin or
/// terminate the child.
///
/// Dropping a process that is still running kills it.
#[derive(Debug)]
pub struct Process {
    command: String,
    args: Vec<String>,
    environment: BTreeMap<OsString, OsString>,
    working_dir: Option<PathBuf>,
    capture: Capture,
    wait_timeout: Option<Duration>,
    poll_interval: Duration,
    settle_delay: Duration,
    started: bool,
    /// Raw pid of the tracked child, 0 when nothing is tracked.
    /// Only written while `reaped` is held.
    pid: AtomicI32,
    /// Serializes reaping and keeps the outcome of whoever reaped the child
    reaped: Mutex<Option<Termination>>,
    /// Set while a signal controller blocks in its reap with `reaped` held
    reaping: AtomicBool,
    streams: Mutex<Streams>,
    /// Writers clone the handle and write outside this lock, so closing
    /// never waits on a writer stuck on a full pipe. The descriptor is
    /// released once the last clone is dropped.
    stdin: Mutex<Option<Arc<ChildStdin>>>,
    /// Serializes writers so their bytes never interleave
    write_lock: Mutex<()>,
}

impl Process {
    /// Create a process for `command` with the given arguments and captured streams
    pub fn new<I, S>(command: impl Into<String>, args: I, capture: Capture) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_config(ProcessConfig::new(command).args(args).capture(capture))
    }

    /// Create a process from a full configuration
    pub fn from_config(config: ProcessConfig) -> Self {
        let mut environment: BTreeMap<OsString, OsString> = std::env::vars_os().collect();
        for (key, value) in config.env {
            environment.insert(key.into(), value.into());
        }

        Self {
            command: config.command,
            args: config.args,
            environment,
            working_dir: config.working_dir,
            capture: config.capture,
            wait_timeout: config.wait_timeout,
            poll_interval: config.poll_interval,
            settle_delay: config.settle_delay,
            started: false,
            pid: AtomicI32::new(0),
            reaped: Mutex::new(None),
            reaping: AtomicBool::new(false),
            streams: Mutex::new(Streams::new(config.capture)),
            stdin: Mutex::new(None),
            write_lock: Mutex::new(()),
        }
    }

    /// Command name
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Arguments passed after the command
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Captured streams
    pub fn capture(&self) -> Capture {
        self.capture
    }

    /// Process ID of the tracked child, None when not running
    pub fn pid(&self) -> Option<u32> {
        match self.pid.load(Ordering::SeqCst) {
            0 => None,
            raw => Some(raw as u32),
        }
    }

    /// Append an argument (takes effect on the next spawn only)
    pub fn add_argument(&mut self, arg: impl Into<String>) {
        self.args.push(arg.into());
    }

    /// Set a variable in the child's private environment copy
    pub fn set_env_var(&mut self, name: impl Into<OsString>, value: impl Into<OsString>) {
        self.environment.insert(name.into(), value.into());
    }

    /// Spawn the child and return its process ID.
    ///
    /// A process entity is single-shot: a second call fails with
    /// [`ProcessError::AlreadyStarted`] and leaves the tracked child untouched.
    pub fn run(&mut self) -> Result<u32> {
        if self.started {
            return Err(ProcessError::AlreadyStarted {
                pid: self.pid().unwrap_or(0),
            });
        }

        let spawned = spawn::spawn(&Launch {
            command: &self.command,
            args: &self.args,
            environment: &self.environment,
            working_dir: self.working_dir.as_deref(),
        })?;

        self.started = true;
        self.streams.get_mut().attach(spawned.stdout, spawned.stderr);
        if self.capture.contains(Capture::IN) {
            *self.stdin.get_mut() = Some(Arc::new(spawned.stdin));
        } else {
            drop(spawned.stdin);
            debug!(pid = %spawned.pid, "Closed stdin, input not captured");
        }
        self.pid.store(spawned.pid.as_raw(), Ordering::SeqCst);

        Ok(spawned.pid.as_raw() as u32)
    }

    /// Wait for the child with the configured budget and poll interval
    pub fn wait(&self) -> Result<Termination> {
        self.poll_until_exit(self.wait_timeout, self.poll_interval)
    }

    /// Wait at most about `timeout` (plus one `poll_interval`) for the child to finish.
    ///
    /// Every tick queries the child's status without blocking, drains both
    /// output pipes and sleeps for `poll_interval`. On exit the pipes are
    /// flushed, stdin is closed and the termination is classified. On
    /// [`ProcessError::Timeout`] the child keeps running and stays tracked.
    pub fn wait_timeout(&self, timeout: Duration, poll_interval: Duration) -> Result<Termination> {
        self.poll_until_exit(Some(timeout), poll_interval)
    }

    fn poll_until_exit(
        &self,
        timeout: Option<Duration>,
        poll_interval: Duration,
    ) -> Result<Termination> {
        if poll_interval.is_zero() {
            return Err(ProcessError::InvalidConfig(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if !self.started {
            return Err(ProcessError::NotStarted);
        }

        let max_cycles = timeout.map(|t| t.as_nanos().div_ceil(poll_interval.as_nanos()));
        let mut cycles: u128 = 0;

        debug!(pid = ?self.pid(), timeout = ?timeout, "Waiting for process");

        loop {
            let raw = self.pid.load(Ordering::SeqCst);
            if raw == 0 {
                return self.recorded();
            }

            // A signal controller holding the lock is reaping; look again next tick.
            if let Some(mut reaped) = self.reaped.try_lock() {
                if self.pid.load(Ordering::SeqCst) != raw {
                    drop(reaped);
                    return self.recorded();
                }

                let pid = Pid::from_raw(raw);
                match signal::query(pid) {
                    Ok(None) => {}
                    Ok(Some(status)) => {
                        let termination = Termination::classify(status);
                        self.finish(&mut reaped, termination.as_ref().ok().copied());
                        debug!(pid = %pid, termination = ?termination, "Process reaped");
                        return termination;
                    }
                    Err(Errno::ECHILD) => {
                        self.finish(&mut reaped, None);
                        return Err(ProcessError::WaitFailed(Errno::ECHILD));
                    }
                    Err(e) => return Err(ProcessError::WaitFailed(e)),
                }
            }

            self.streams.lock().drain_both();

            if let Some(max) = max_cycles {
                if cycles > max {
                    let timeout = timeout.unwrap_or_default();
                    warn!(pid = raw, timeout = ?timeout, "Timed out waiting for process");
                    return Err(ProcessError::Timeout { timeout });
                }
            }

            thread::sleep(poll_interval);
            cycles += 1;
        }
    }

    /// Outcome of a child that is no longer tracked
    fn recorded(&self) -> Result<Termination> {
        match *self.reaped.lock() {
            Some(termination) => Ok(termination),
            None if self.started => Err(ProcessError::WaitFailed(Errno::ECHILD)),
            None => Err(ProcessError::NotStarted),
        }
    }

    /// Flush and close everything of a reaped child, then stop tracking it.
    ///
    /// Must be called with the reaping lock held.
    fn finish(&self, reaped: &mut MutexGuard<'_, Option<Termination>>, outcome: Option<Termination>) {
        let out = self.flush(Channel::Stdout);
        let err = self.flush(Channel::Stderr);
        self.streams.lock().close();
        debug!(stdout = out, stderr = err, "Flushed output after exit");
        self.close_write_channel();
        **reaped = outcome;
        self.pid.store(0, Ordering::SeqCst);
    }

    /// Drain `channel` until it reports nothing more, returning the bytes read.
    ///
    /// The guard is taken per drain so concurrent readers interleave.
    fn flush(&self, channel: Channel) -> usize {
        let mut total = 0;
        loop {
            let n = self.streams.lock().drain_once(channel);
            if n == 0 {
                return total;
            }
            total += n;
        }
    }

    /// Everything captured on stdout since the last call
    pub fn read_all_stdout(&self) -> Vec<u8> {
        self.read_all(Channel::Stdout)
    }

    /// Everything captured on stderr since the last call
    pub fn read_all_stderr(&self) -> Vec<u8> {
        self.read_all(Channel::Stderr)
    }

    fn read_all(&self, channel: Channel) -> Vec<u8> {
        // Give late bytes a moment to reach the pipe; never sleep under the guard.
        if !self.settle_delay.is_zero() {
            thread::sleep(self.settle_delay);
        }

        let mut streams = self.streams.lock();
        streams.drain_once(channel);
        streams.take(channel)
    }

    /// Write bytes to the child's stdin.
    ///
    /// Returns false when stdin is closed or the write failed. A write
    /// blocked on a full pipe never holds up `close_write_channel` or the
    /// wait loop.
    pub fn write(&self, bytes: &[u8]) -> bool {
        let _writer = self.write_lock.lock();
        let Some(stdin) = self.stdin.lock().clone() else {
            return false;
        };

        let mut pipe: &ChildStdin = &stdin;
        match pipe.write_all(bytes).and_then(|_| pipe.flush()) {
            Ok(()) => true,
            Err(e) => {
                warn!(pid = ?self.pid(), error = %e, "Failed to write to stdin");
                false
            }
        }
    }

    /// Close the child's stdin so it sees end of input
    pub fn close_write_channel(&self) {
        if self.stdin.lock().take().is_some() {
            debug!(pid = ?self.pid(), "Closed stdin");
        }
    }

    /// Send SIGINT and block until the child changed state.
    ///
    /// There is no timeout: a child ignoring SIGINT blocks the caller until
    /// someone kills it.
    pub fn interrupt(&self) -> Result<()> {
        self.terminate(Signal::SIGINT)
    }

    /// Send SIGKILL and block until the child is reaped
    pub fn kill(&self) -> Result<()> {
        self.terminate(Signal::SIGKILL)
    }

    /// Signal and reap the tracked child.
    ///
    /// The pid is read and signaled under the reaping lock, so a concurrent
    /// wait loop cannot reap it in between. The one exception is another
    /// controller blocked in its reap (an ignored SIGINT): it owns the lock
    /// until the child changes state, so the signal is delivered without the
    /// lock to unblock it. That child is not reaped yet, its pid stays valid.
    fn terminate(&self, sig: Signal) -> Result<()> {
        let mut delivered_to = 0;
        let mut reaped = loop {
            if let Some(reaped) = self.reaped.try_lock() {
                break reaped;
            }
            let raw = self.pid.load(Ordering::SeqCst);
            if raw == 0 {
                return Ok(());
            }
            if self.reaping.load(Ordering::SeqCst) && delivered_to != raw {
                signal::send(Pid::from_raw(raw), sig)?;
                delivered_to = raw;
            }
            thread::sleep(LOCK_RETRY_INTERVAL);
        };

        let raw = self.pid.load(Ordering::SeqCst);
        if raw == 0 {
            // Reaped by someone else while we waited for the lock.
            return Ok(());
        }

        let pid = Pid::from_raw(raw);
        debug!(pid = %pid, signal = %sig, "Terminating process");
        if delivered_to != raw {
            signal::send(pid, sig)?;
        }

        self.reaping.store(true, Ordering::SeqCst);
        let termination = signal::reap_blocking(pid);
        self.reaping.store(false, Ordering::SeqCst);
        let termination = termination?;

        self.finish(&mut reaped, termination);
        info!(pid = %pid, termination = ?termination, "Process terminated");
        Ok(())
    }

    /// Whether the tracked child still exists
    pub fn exists(&self) -> bool {
        loop {
            let reaped = self.reaped.try_lock();
            // A controller blocked in its reap has not reaped yet; the pid is still ours.
            if reaped.is_some() || self.reaping.load(Ordering::SeqCst) {
                return match self.pid.load(Ordering::SeqCst) {
                    0 => false,
                    raw => signal::probe(Pid::from_raw(raw)),
                };
            }
            thread::sleep(LOCK_RETRY_INTERVAL);
        }
    }
}

impl Drop for Process {
    fn drop(&mut self) {
        self.close_write_channel();
        if let Some(pid) = self.pid() {
            warn!(pid = %pid, command = %self.command, "Process still running on drop, killing");
            if let Err(e) = self.kill() {
                warn!(pid = %pid, error = %e, "Failed to kill process on drop");
            }
        }
    }
}
