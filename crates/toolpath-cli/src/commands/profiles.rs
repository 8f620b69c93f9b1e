//! Profile listing command.

use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use plugin_skeinforge::preferences::PreferenceStore;
use toolpath_core::config::AppConfig;
use toolpath_core::AppResult;

/// One row of the profile table
#[derive(Debug, Serialize, Tabled)]
struct ProfileRow {
    /// Display name
    #[tabled(rename = "Name")]
    name: String,
    /// Full path
    #[tabled(rename = "Path")]
    path: String,
    /// Whether this is the remembered profile
    #[tabled(rename = "Last used")]
    #[serde(rename = "last_used")]
    last_used: bool,
}

/// Execute the profiles command
pub async fn execute(config: &AppConfig, format: OutputFormat) -> AppResult<()> {
    let generator = super::create_generator(config)?;
    let prefs = super::preference_store(config).load()?;

    let rows: Vec<ProfileRow> = generator
        .profiles()
        .into_iter()
        .map(|p| ProfileRow {
            last_used: prefs.profile_path.as_deref() == Some(p.full_path()),
            name: p.display_name().to_string(),
            path: p.full_path().display().to_string(),
        })
        .collect();

    let empty = format!(
        "No profiles found in {}",
        generator.layout().profiles_dir.display()
    );
    output::print_list(&rows, format, &empty);
    Ok(())
}
