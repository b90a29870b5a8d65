//! Non-blocking pipe drains and the buffers they feed

use std::io::{self, Read};
use std::process::{ChildStderr, ChildStdout};

use tracing::warn;

use crate::capture::Capture;

/// Upper bound of a single drain
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Read once from a non-blocking pipe end.
///
/// Kept bytes are appended to `sink`, others are thrown away. Returns the
/// number of bytes read; 0 means either "nothing available right now" or
/// end of stream, and callers tell them apart by the child's exit status.
pub fn drain<R: Read + ?Sized>(source: &mut R, sink: &mut Vec<u8>, keep: bool) -> usize {
    let mut chunk = [0u8; CHUNK_SIZE];
    loop {
        match source.read(&mut chunk) {
            Ok(n) => {
                if keep {
                    sink.extend_from_slice(&chunk[..n]);
                }
                return n;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return 0,
            Err(e) => {
                warn!(error = %e, "Pipe read failed");
                return 0;
            }
        }
    }
}

/// Read ends of the output pipes together with what was drained from them.
///
/// Lives behind the entity's guard; every read from the pipes goes through
/// [`Streams::drain_once`] while the guard is held.
#[derive(Debug)]
pub(crate) struct Streams {
    capture: Capture,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    out: Vec<u8>,
    err: Vec<u8>,
}

/// Selects one of the two output channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Channel {
    Stdout,
    Stderr,
}

impl Streams {
    pub(crate) fn new(capture: Capture) -> Self {
        Self {
            capture,
            stdout: None,
            stderr: None,
            out: Vec::new(),
            err: Vec::new(),
        }
    }

    pub(crate) fn attach(&mut self, stdout: ChildStdout, stderr: ChildStderr) {
        self.stdout = Some(stdout);
        self.stderr = Some(stderr);
    }

    /// One drain of the given channel; 0 when the channel is closed
    pub(crate) fn drain_once(&mut self, channel: Channel) -> usize {
        match channel {
            Channel::Stdout => match self.stdout.as_mut() {
                Some(pipe) => drain(pipe, &mut self.out, self.capture.contains(Capture::OUT)),
                None => 0,
            },
            Channel::Stderr => match self.stderr.as_mut() {
                Some(pipe) => drain(pipe, &mut self.err, self.capture.contains(Capture::ERR)),
                None => 0,
            },
        }
    }

    /// Drain both channels once
    pub(crate) fn drain_both(&mut self) {
        self.drain_once(Channel::Stdout);
        self.drain_once(Channel::Stderr);
    }

    /// Close both read ends
    pub(crate) fn close(&mut self) {
        self.stdout = None;
        self.stderr = None;
    }

    /// Hand over what was accumulated for `channel`, leaving the buffer empty
    pub(crate) fn take(&mut self, channel: Channel) -> Vec<u8> {
        match channel {
            Channel::Stdout => std::mem::take(&mut self.out),
            Channel::Stderr => std::mem::take(&mut self.err),
        }
    }
}
