//! Persisted preference configuration.

use serde::{Deserialize, Serialize};

/// Where the last-used profile and raft choice are remembered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferencesConfig {
    /// Path to the JSON preferences file.
    #[serde(default = "default_file")]
    pub file: String,
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            file: default_file(),
        }
    }
}

fn default_file() -> String {
    "data/preferences.json".to_string()
}
