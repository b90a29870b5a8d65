//! Property-based tests for byte-exact capture
//!
//! For every combination of capture flags, what the child writes on a captured
//! stream is returned unchanged by the accessors, whatever the payload size and
//! however the bytes were split across internal drains.

use std::io::Write;
use std::time::Duration;

use proptest::prelude::*;
use spawnkit::{Capture, Process, ProcessConfig};

fn capture_strategy() -> impl Strategy<Value = Capture> {
    (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(out, err, input)| {
        let mut capture = Capture::NONE;
        capture.set(Capture::OUT, out);
        capture.set(Capture::ERR, err);
        capture.set(Capture::IN, input);
        capture
    })
}

/// Property: captured stdout and stderr equal the child's output byte for byte
#[test]
fn prop_captured_bytes_match_child_output() {
    proptest!(ProptestConfig::with_cases(24), |(
        payload in prop::collection::vec(any::<u8>(), 0..200_000),
        capture in capture_strategy(),
        poll_ms in 1u64..30,
    )| {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&payload).unwrap();
        file.flush().unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let mut process = Process::from_config(
            ProcessConfig::new("sh")
                .args(["-c", "cat \"$1\"; cat \"$1\" >&2", "sh", path.as_str()])
                .capture(capture)
                .poll_interval(Duration::from_millis(poll_ms))
                .settle_delay(Duration::ZERO),
        );
        process.run().unwrap();

        // Interleave accessor reads with the wait to split the output unevenly.
        let mut stdout = process.read_all_stdout();
        let mut stderr = process.read_all_stderr();
        let status = process.wait_timeout(Duration::from_secs(20), Duration::from_millis(poll_ms)).unwrap();
        prop_assert!(status.success());
        stdout.extend(process.read_all_stdout());
        stderr.extend(process.read_all_stderr());

        let expected_out: &[u8] = if capture.contains(Capture::OUT) { &payload } else { &[] };
        let expected_err: &[u8] = if capture.contains(Capture::ERR) { &payload } else { &[] };
        prop_assert_eq!(stdout.as_slice(), expected_out);
        prop_assert_eq!(stderr.as_slice(), expected_err);
    });
}

/// Property: exit codes pass through the classification unchanged
#[test]
fn prop_exit_code_round_trip() {
    proptest!(ProptestConfig::with_cases(16), |(code in 0i32..=255)| {
        let status = spawnkit::run("sh", ["-c".to_string(), format!("exit {}", code)]).unwrap();
        prop_assert_eq!(status.code(), code);
        prop_assert_eq!(status.success(), code == 0);
    });
}
