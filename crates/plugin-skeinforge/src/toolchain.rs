//! Skeinforge toolchain location.
//!
//! The toolchain root is either configured explicitly (`toolchain.path`,
//! or `TOOLPATH__TOOLCHAIN__PATH` in the environment) or falls back to
//! `<working directory>/<dir_name>`. Nothing is validated on disk here; a
//! missing root surfaces as an empty profile list or a launch failure.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use toolpath_core::config::toolchain::ToolchainConfig;
use tracing::{debug, info};

use crate::error::GeneratorError;

/// How the toolchain root was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootSource {
    /// Taken from configuration or the environment.
    ExplicitConfig,
    /// Derived from the process working directory.
    WorkingDirectory,
}

/// Resolved paths and names for invoking the toolchain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainLayout {
    /// Toolchain root; the child runs with this as its working directory.
    pub root: PathBuf,
    /// Interpreter executable.
    pub interpreter: String,
    /// Entry-point script, relative to `root`.
    pub entry_script: String,
    /// Directory holding installed profiles.
    pub profiles_dir: PathBuf,
    /// How `root` was chosen.
    pub source: RootSource,
}

impl ToolchainLayout {
    /// Resolve the layout against the current process working directory.
    pub fn from_config(config: &ToolchainConfig) -> Result<Self, GeneratorError> {
        let cwd = std::env::current_dir()?;
        Ok(Self::resolve(config, &cwd))
    }

    /// Resolve the layout against an explicit working directory.
    pub fn resolve(config: &ToolchainConfig, cwd: &Path) -> Self {
        let (root, source) = match config.configured_path() {
            Some(path) => {
                info!(path = %path.display(), "Using configured Skeinforge path");
                (path.to_path_buf(), RootSource::ExplicitConfig)
            }
            None => {
                let root = cwd.join(&config.dir_name);
                debug!(
                    path = %root.display(),
                    "Skeinforge path not configured, using working directory"
                );
                (root, RootSource::WorkingDirectory)
            }
        };

        let profiles_dir = root.join(&config.profiles_dir);

        Self {
            root,
            interpreter: config.interpreter.clone(),
            entry_script: config.entry_script.clone(),
            profiles_dir,
            source,
        }
    }

    /// Human-readable description of the layout.
    pub fn summary(&self) -> String {
        let method = match self.source {
            RootSource::ExplicitConfig => "explicit config",
            RootSource::WorkingDirectory => "working directory",
        };
        format!(
            "{} {} at {} (found via {})",
            self.interpreter,
            self.entry_script,
            self.root.display(),
            method
        )
    }
}
