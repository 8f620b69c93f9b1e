//! Line-oriented draining of child process output streams.
//!
//! Each stream of the child gets its own [`LineStreamDrainer`] running as an
//! independent task, so a full pipe on one side never blocks the other or
//! the child. Lines are split on `\n`, `\r\n` or a lone `\r` and decoded
//! lossily; invalid UTF-8 never stops the drain.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{trace, warn};

use crate::sink::{LogSink, Severity, UpdateCallback};

/// Read buffer size per drainer.
const READ_CHUNK: usize = 8 * 1024;

/// Longest line held before a break is forced.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// LineSplitter
// ---------------------------------------------------------------------------

/// Incremental byte-to-line splitter.
///
/// Bytes of an unfinished line are held until a terminator arrives, so
/// multi-byte characters split across reads decode correctly. A line that
/// reaches `max_line` bytes without a terminator is emitted as is, which may
/// cut a multi-byte character in two.
#[derive(Debug)]
pub struct LineSplitter {
    partial: Vec<u8>,
    after_cr: bool,
    after_break: bool,
    max_line: usize,
}

impl Default for LineSplitter {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl LineSplitter {
    /// Create an empty splitter breaking lines at [`MAX_LINE_BYTES`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty splitter breaking lines at `max_line` bytes.
    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            partial: Vec::new(),
            after_cr: false,
            after_break: false,
            max_line: max_line.max(1),
        }
    }

    /// Feed bytes, returning every line they complete.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in bytes {
            if self.after_cr {
                self.after_cr = false;
                if byte == b'\n' {
                    continue;
                }
            }
            // A terminator right after a forced break ends that same line.
            let after_break = std::mem::take(&mut self.after_break);
            match byte {
                b'\n' => {
                    if !after_break {
                        lines.push(self.take_line());
                    }
                }
                b'\r' => {
                    if !after_break {
                        lines.push(self.take_line());
                    }
                    self.after_cr = true;
                }
                _ => {
                    self.partial.push(byte);
                    if self.partial.len() >= self.max_line {
                        lines.push(self.take_line());
                        self.after_break = true;
                    }
                }
            }
        }
        lines
    }

    /// End of stream: the unterminated remainder, unless empty.
    pub fn finish(&mut self) -> Option<String> {
        if self.partial.is_empty() {
            None
        } else {
            Some(self.take_line())
        }
    }

    fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.partial).into_owned();
        self.partial.clear();
        line
    }
}

// ---------------------------------------------------------------------------
// TailBuffer
// ---------------------------------------------------------------------------

/// Keeps the most recent `capacity` lines of a stream.
#[derive(Debug)]
pub struct TailBuffer {
    lines: VecDeque<String>,
    capacity: usize,
    truncated: bool,
}

/// Tail buffer shared between a drainer task and the orchestrator.
pub type SharedTail = Arc<Mutex<TailBuffer>>;

impl TailBuffer {
    /// Create a buffer keeping at most `capacity` lines (minimum one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            truncated: false,
        }
    }

    /// Create a buffer ready to be shared with a drainer task.
    pub fn shared(capacity: usize) -> SharedTail {
        Arc::new(Mutex::new(Self::new(capacity)))
    }

    /// Append a line, dropping the oldest when full.
    pub fn push(&mut self, line: String) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
            self.truncated = true;
        }
        self.lines.push_back(line);
    }

    /// Whether any line was dropped.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Copy out the retained lines, oldest first.
    pub fn to_vec(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }
}

// ---------------------------------------------------------------------------
// LineStreamDrainer
// ---------------------------------------------------------------------------

/// Reads one output stream to its end and forwards each line.
pub struct LineStreamDrainer {
    stream: &'static str,
    severity: Severity,
    sink: Arc<dyn LogSink>,
    on_update: Option<UpdateCallback>,
    capture: SharedTail,
}

impl LineStreamDrainer {
    /// Drainer for the primary stream (standard output): lines are logged as
    /// [`Severity::Verbose`] and also passed to `on_update`.
    pub fn primary(
        sink: Arc<dyn LogSink>,
        on_update: Option<UpdateCallback>,
        capture: SharedTail,
    ) -> Self {
        Self {
            stream: "stdout",
            severity: Severity::Verbose,
            sink,
            on_update,
            capture,
        }
    }

    /// Drainer for standard error: lines are logged as [`Severity::Error`].
    pub fn secondary(sink: Arc<dyn LogSink>, capture: SharedTail) -> Self {
        Self {
            stream: "stderr",
            severity: Severity::Error,
            sink,
            on_update: None,
            capture,
        }
    }

    /// Drain `reader` until end of stream or a read error, returning the
    /// number of lines delivered.
    pub async fn drain<R>(self, mut reader: R) -> usize
    where
        R: AsyncRead + Unpin,
    {
        let mut splitter = LineSplitter::new();
        let mut buf = vec![0u8; READ_CHUNK];
        let mut delivered = 0usize;

        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    for line in splitter.push(&buf[..n]) {
                        self.deliver(line);
                        delivered += 1;
                    }
                }
                Err(e) => {
                    warn!(stream = self.stream, error = %e, "Stopped reading toolchain output");
                    break;
                }
            }
        }

        if let Some(line) = splitter.finish() {
            self.deliver(line);
            delivered += 1;
        }

        trace!(stream = self.stream, lines = delivered, "Stream drained");
        delivered
    }

    fn deliver(&self, line: String) {
        self.sink.log_message(&line, self.severity);
        if let Some(on_update) = &self.on_update {
            on_update(&line);
        }
        self.capture
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(line);
    }
}
