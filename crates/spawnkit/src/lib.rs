//! # spawnkit
//!
//! **Purpose**: Child process lifecycle management on POSIX systems
//!
//! Spawns an external command with its standard streams bound to pipes,
//! captures what it writes, waits for it within a time budget, and
//! terminates it with signals. A single [`Process`] may be shared between
//! threads: one waits while others read captured output or feed stdin.
//!
//! ## Features
//!
//! - **Pipe Capture**: stdout/stderr are drained without blocking; streams that
//!   are not captured are still drained so the child never stalls on a full pipe
//! - **Bounded Waits**: a polling wait loop that unifies exit detection,
//!   output draining and a deadline
//! - **Signal Termination**: SIGINT / SIGKILL followed by a blocking reap
//! - **One-shot Runs**: [`run`], [`run_stdout`] and [`run_output`]
//! - **Async Façade**: [`ProcessManager`] for tokio callers
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use spawnkit::{Capture, Process};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut process = Process::new("cat", Vec::<String>::new(), Capture::OUT | Capture::IN);
//! process.run()?;
//!
//! process.write(b"hello\n");
//! process.close_write_channel();
//!
//! let status = process.wait_timeout(Duration::from_secs(5), Duration::from_millis(50))?;
//! assert!(status.success());
//! assert_eq!(process.read_all_stdout(), b"hello\n");
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod config;
pub mod drain;
pub mod error;
pub mod manager;
pub mod process;
pub mod runner;
mod signal;
mod spawn;
pub mod status;

pub use capture::Capture;
pub use config::ProcessConfig;
pub use error::{ProcessError, Result};
pub use manager::ProcessManager;
pub use process::Process;
pub use runner::{run, run_output, run_stdout, Output};
pub use status::Termination;
