//! Remembered profile and raft choices.
//!
//! The configuration step reads these to preselect the last profile and
//! writes them back once the user has chosen. The generator itself only
//! ever sees the resulting [`crate::models::GenerationConfig`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GeneratorError;

/// The persisted choices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlicingPreferences {
    /// Full path of the last selected profile.
    pub profile_path: Option<PathBuf>,
    /// Last raft choice.
    pub use_raft: bool,
}

/// Storage for [`SlicingPreferences`].
pub trait PreferenceStore: Send + Sync {
    /// Load the stored preferences, or defaults when nothing is stored.
    fn load(&self) -> Result<SlicingPreferences, GeneratorError>;

    /// Persist `prefs`, replacing what was stored.
    fn save(&self, prefs: &SlicingPreferences) -> Result<(), GeneratorError>;
}

/// Preferences kept in a JSON file.
#[derive(Debug, Clone)]
pub struct JsonPreferenceStore {
    path: PathBuf,
}

impl JsonPreferenceStore {
    /// Store preferences at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for JsonPreferenceStore {
    fn load(&self) -> Result<SlicingPreferences, GeneratorError> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No stored preferences, using defaults");
                return Ok(SlicingPreferences::default());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&data)?)
    }

    fn save(&self, prefs: &SlicingPreferences) -> Result<(), GeneratorError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(prefs)?;
        std::fs::write(&self.path, data)?;
        debug!(path = %self.path.display(), "Saved preferences");
        Ok(())
    }
}
