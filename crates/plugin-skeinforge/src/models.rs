//! Domain models: profiles, run configuration, invocation, outcome, artifact.

use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::GeneratorError;

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// An installed Skeinforge profile directory.
///
/// Profiles sort by display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    full_path: PathBuf,
    display_name: String,
}

impl Profile {
    /// Build a profile from its directory path. The display name is the
    /// final path component, or the whole path when it has none.
    pub fn from_path(full_path: impl Into<PathBuf>) -> Self {
        let full_path = full_path.into();
        let display_name = full_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| full_path.to_string_lossy().into_owned());
        Self {
            full_path,
            display_name,
        }
    }

    /// Absolute path of the profile directory.
    pub fn full_path(&self) -> &Path {
        &self.full_path
    }

    /// Name shown to the user.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

impl Ord for Profile {
    fn cmp(&self, other: &Self) -> Ordering {
        self.display_name
            .cmp(&other.display_name)
            .then_with(|| self.full_path.cmp(&other.full_path))
    }
}

impl PartialOrd for Profile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name)
    }
}

// ---------------------------------------------------------------------------
// GenerationConfig
// ---------------------------------------------------------------------------

/// Validated, immutable input for one generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationConfig {
    profile_path: PathBuf,
    use_raft: bool,
}

impl GenerationConfig {
    /// Validate the chosen profile and raft flag.
    ///
    /// An empty profile path or one that is not a directory is rejected here,
    /// before any process is spawned.
    pub fn new(profile_path: impl Into<PathBuf>, use_raft: bool) -> Result<Self, GeneratorError> {
        let profile_path = profile_path.into();
        if profile_path.as_os_str().is_empty() {
            return Err(GeneratorError::ProfileNotSet);
        }
        if !profile_path.is_dir() {
            return Err(GeneratorError::ProfileNotFound { path: profile_path });
        }
        Ok(Self {
            profile_path,
            use_raft,
        })
    }

    /// The selected profile directory.
    pub fn profile_path(&self) -> &Path {
        &self.profile_path
    }

    /// Whether a raft is requested.
    pub fn use_raft(&self) -> bool {
        self.use_raft
    }

    /// The selected profile.
    pub fn profile(&self) -> Profile {
        Profile::from_path(self.profile_path.clone())
    }
}

// ---------------------------------------------------------------------------
// InvocationSpec
// ---------------------------------------------------------------------------

/// A fully-built external command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationSpec {
    /// Program to launch.
    pub executable: String,
    /// Arguments, in order.
    pub arguments: Vec<String>,
    /// Directory the program runs in.
    pub working_directory: PathBuf,
}

impl fmt::Display for InvocationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.executable)?;
        for arg in &self.arguments {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// How a run ended. Exactly one per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProcessOutcome {
    /// The toolchain exited with code 0.
    Success,
    /// The toolchain exited with a non-zero code (-1 when killed by a signal).
    NonZeroExit {
        /// Exit code.
        code: i32,
    },
    /// The process could not be started.
    LaunchFailure {
        /// OS error description.
        cause: String,
    },
    /// The run was cancelled and the child killed.
    Cancelled,
}

impl ProcessOutcome {
    /// Exit code 0.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Launch failure or non-zero exit.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::NonZeroExit { .. } | Self::LaunchFailure { .. })
    }

    /// One-line human-readable description.
    pub fn summary(&self) -> String {
        match self {
            Self::Success => "completed successfully".to_string(),
            Self::NonZeroExit { code } => format!("toolchain exited with code {code}"),
            Self::LaunchFailure { cause } => format!("could not start toolchain: {cause}"),
            Self::Cancelled => "cancelled".to_string(),
        }
    }
}

/// Trailing output lines kept from each stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedOutput {
    /// Standard output lines, oldest first.
    pub stdout: Vec<String>,
    /// Standard error lines, oldest first.
    pub stderr: Vec<String>,
    /// Whether older lines were dropped from either stream.
    pub truncated: bool,
}

/// Result of [`crate::orchestrator::ProcessOrchestrator::run`].
#[derive(Debug, Clone)]
pub struct ProcessRun {
    /// How the process ended.
    pub outcome: ProcessOutcome,
    /// Captured output tails.
    pub output: CapturedOutput,
    /// OS process id, if the process was started.
    pub pid: Option<u32>,
    /// Wall time from launch to return.
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

/// The expected G-code file of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildArtifact {
    /// Input path without its extension.
    pub base_name: PathBuf,
    /// Where the toolchain writes its G-code.
    pub output_path: PathBuf,
}
