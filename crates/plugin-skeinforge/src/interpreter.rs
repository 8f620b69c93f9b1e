//! Interpreter availability and version-range check.
//!
//! Skeinforge only runs on a narrow range of Python releases, so the
//! interpreter is probed with `--version` before a run is configured.
//! Python 2 prints its banner on stderr, Python 3 on stdout; both are read.

use std::fmt;
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::GeneratorError;

/// How long `--version` may take before the interpreter is considered
/// unusable.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// A `major.minor.patch` interpreter version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InterpreterVersion {
    /// Major component.
    pub major: u32,
    /// Minor component.
    pub minor: u32,
    /// Patch component.
    pub patch: u32,
}

impl InterpreterVersion {
    /// Construct a version.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for InterpreterVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for InterpreterVersion {
    type Err = GeneratorError;

    /// Parses `3`, `2.7`, `2.7.18` and tolerates suffixes such as `3.0.1rc1`
    /// or a trailing `+`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GeneratorError::InvalidVersion {
            value: s.to_string(),
        };

        let mut parts = s.trim().split('.');
        let mut next = |required: bool| -> Result<u32, GeneratorError> {
            match parts.next() {
                Some(part) => {
                    let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
                    digits.parse().map_err(|_| invalid())
                }
                None if required => Err(invalid()),
                None => Ok(0),
            }
        };

        let major = next(true)?;
        let minor = next(false)?;
        let patch = next(false)?;
        Ok(Self::new(major, minor, patch))
    }
}

/// Accepted versions: `min <= v < max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRange {
    /// Inclusive lower bound.
    pub min: InterpreterVersion,
    /// Exclusive upper bound.
    pub max: InterpreterVersion,
}

impl VersionRange {
    /// Parse both bounds.
    pub fn parse(min: &str, max: &str) -> Result<Self, GeneratorError> {
        Ok(Self {
            min: min.parse()?,
            max: max.parse()?,
        })
    }

    /// Whether `version` lies in the range.
    pub fn contains(&self, version: InterpreterVersion) -> bool {
        self.min <= version && version < self.max
    }
}

/// Runs the interpreter to find out what it is.
pub struct InterpreterProbe;

impl InterpreterProbe {
    /// Extract the version from a `Python X.Y.Z` banner.
    pub fn parse_banner(output: &str) -> Option<InterpreterVersion> {
        let mut tokens = output.split_whitespace();
        while let Some(token) = tokens.next() {
            if token.eq_ignore_ascii_case("python") {
                return tokens.next().and_then(|v| v.parse().ok());
            }
        }
        None
    }

    /// Run `<interpreter> --version` and parse its banner.
    pub async fn detect(interpreter: &str) -> Result<InterpreterVersion, GeneratorError> {
        let not_found = |reason: String| GeneratorError::InterpreterNotFound {
            interpreter: interpreter.to_string(),
            reason,
        };

        let mut cmd = Command::new(interpreter);
        cmd.arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(PROBE_TIMEOUT, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(not_found(e.to_string())),
            Err(_) => {
                return Err(not_found(format!(
                    "no answer to --version within {}s",
                    PROBE_TIMEOUT.as_secs()
                )));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(
            interpreter = interpreter,
            status = ?output.status.code(),
            stdout = %stdout.trim(),
            stderr = %stderr.trim(),
            "Interpreter version probe finished"
        );

        Self::parse_banner(&stdout)
            .or_else(|| Self::parse_banner(&stderr))
            .ok_or_else(|| GeneratorError::InterpreterVersionUnreadable {
                output: format!("{}{}", stdout.trim(), stderr.trim())
                    .chars()
                    .take(200)
                    .collect(),
            })
    }

    /// Detect the interpreter version and require it to lie in `range`.
    pub async fn check(
        interpreter: &str,
        range: VersionRange,
    ) -> Result<InterpreterVersion, GeneratorError> {
        let version = Self::detect(interpreter).await?;
        if !range.contains(version) {
            warn!(
                interpreter = interpreter,
                found = %version,
                min = %range.min,
                max = %range.max,
                "Interpreter version outside supported range"
            );
            return Err(GeneratorError::InterpreterVersionUnsupported {
                found: version.to_string(),
                min: range.min.to_string(),
                max: range.max.to_string(),
            });
        }
        info!(interpreter = interpreter, version = %version, "Interpreter accepted");
        Ok(version)
    }
}
