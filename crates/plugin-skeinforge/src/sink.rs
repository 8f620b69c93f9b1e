//! Destinations for toolchain output lines.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Severity assigned to a line by the stream it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Standard output: progress chatter.
    Verbose,
    /// Standard error.
    Error,
}

/// Receives every line the toolchain prints.
///
/// Called concurrently from both drainer tasks; lines of one stream arrive
/// in order, lines of different streams interleave arbitrarily.
pub trait LogSink: Send + Sync {
    /// Record one output line.
    fn log_message(&self, line: &str, severity: Severity);
}

/// Live progress callback, invoked for standard-output lines only.
pub type UpdateCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Forwards toolchain output into `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log_message(&self, line: &str, severity: Severity) {
        match severity {
            Severity::Verbose => tracing::debug!(target: "skeinforge", "{line}"),
            Severity::Error => tracing::error!(target: "skeinforge", "{line}"),
        }
    }
}
