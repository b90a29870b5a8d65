//! Pipe descriptors are released on every exit path of a process.
//!
//! Kept as a single test in its own binary: the descriptor table is
//! process-wide, so parallel tests would skew the counts.

use std::time::Duration;

use spawnkit::{Capture, Process, ProcessConfig};

fn open_descriptors() -> usize {
    std::fs::read_dir("/proc/self/fd")
        .expect("read /proc/self/fd")
        .count()
}

fn config(command: &str, args: &[&str]) -> ProcessConfig {
    ProcessConfig::new(command)
        .args(args.iter().copied())
        .capture(Capture::default())
        .poll_interval(Duration::from_millis(10))
        .settle_delay(Duration::ZERO)
}

#[cfg(target_os = "linux")]
#[test]
fn test_no_descriptor_leaks() {
    let before = open_descriptors();

    for _ in 0..20 {
        let mut process = Process::from_config(config("spawnkit-definitely-not-a-command", &[]));
        assert!(process.run().is_err());
        assert_eq!(open_descriptors(), before, "failed spawn leaked a descriptor");
    }

    for _ in 0..20 {
        let mut process = Process::from_config(config("echo", &["hello"]));
        process.run().expect("spawn");
        assert!(open_descriptors() > before);

        process.wait().expect("wait");
        assert_eq!(open_descriptors(), before, "reaped process kept a descriptor");
        assert_eq!(process.read_all_stdout(), b"hello\n");
    }

    for _ in 0..20 {
        let mut process = Process::from_config(config("sleep", &["10"]));
        process.run().expect("spawn");

        process.kill().expect("kill");
        assert_eq!(open_descriptors(), before, "killed process kept a descriptor");
    }

    for _ in 0..5 {
        let mut process = Process::from_config(config("sleep", &["10"]));
        process.run().expect("spawn");
        drop(process);
    }
    assert_eq!(open_descriptors(), before, "dropped process kept a descriptor");
}
