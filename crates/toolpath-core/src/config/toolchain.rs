//! External toolchain configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Configuration for the Skeinforge toolchain invocation.
///
/// If `path` is not set (or is empty), the toolchain root defaults to
/// `<current working directory>/<dir_name>`.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// Explicit toolchain root directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Directory name used under the working directory when `path` is unset.
    #[serde(default = "default_dir_name")]
    #[validate(length(min = 1))]
    pub dir_name: String,

    /// Interpreter executable used to run the entry script.
    #[serde(default = "default_interpreter")]
    #[validate(length(min = 1))]
    pub interpreter: String,

    /// Entry-point script, relative to the toolchain root.
    #[serde(default = "default_entry_script")]
    #[validate(length(min = 1))]
    pub entry_script: String,

    /// Subdirectory of the toolchain root holding installed profiles.
    #[serde(default = "default_profiles_dir")]
    #[validate(length(min = 1))]
    pub profiles_dir: String,

    /// Lowest accepted interpreter version (inclusive).
    #[serde(default = "default_min_interpreter_version")]
    pub min_interpreter_version: String,

    /// First rejected interpreter version (exclusive).
    #[serde(default = "default_max_interpreter_version")]
    pub max_interpreter_version: String,

    /// Number of trailing lines kept per output stream for diagnostics.
    #[serde(default = "default_capture_lines")]
    #[validate(range(min = 1, max = 100000))]
    pub capture_lines: usize,

    /// How long drainers may keep reading after the child was killed.
    #[serde(default = "default_drain_grace_ms")]
    #[validate(range(max = 60000))]
    pub drain_grace_ms: u64,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            path: None,
            dir_name: default_dir_name(),
            interpreter: default_interpreter(),
            entry_script: default_entry_script(),
            profiles_dir: default_profiles_dir(),
            min_interpreter_version: default_min_interpreter_version(),
            max_interpreter_version: default_max_interpreter_version(),
            capture_lines: default_capture_lines(),
            drain_grace_ms: default_drain_grace_ms(),
        }
    }
}

impl ToolchainConfig {
    /// The explicitly configured root, ignoring an empty value.
    pub fn configured_path(&self) -> Option<&Path> {
        self.path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }
}

fn default_dir_name() -> String {
    "skeinforge".to_string()
}

fn default_interpreter() -> String {
    "python".to_string()
}

fn default_entry_script() -> String {
    "skeinforge.py".to_string()
}

fn default_profiles_dir() -> String {
    "prefs".to_string()
}

fn default_min_interpreter_version() -> String {
    "2.5.0".to_string()
}

fn default_max_interpreter_version() -> String {
    "3.0.0".to_string()
}

fn default_capture_lines() -> usize {
    1000
}

fn default_drain_grace_ms() -> u64 {
    2000
}
