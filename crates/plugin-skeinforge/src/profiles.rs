//! Installed profile enumeration.

use std::path::Path;

use tracing::debug;

use crate::models::Profile;

/// Finds the profiles installed under a toolchain's profiles directory.
pub struct ProfileLocator;

impl ProfileLocator {
    /// List every subdirectory of `profiles_dir` as a profile, sorted by
    /// display name.
    ///
    /// A missing or unreadable directory yields an empty list; entries that
    /// are not directories are skipped.
    pub fn list_profiles(profiles_dir: &Path) -> Vec<Profile> {
        let entries = match std::fs::read_dir(profiles_dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(
                    dir = %profiles_dir.display(),
                    error = %e,
                    "Profiles directory not readable"
                );
                return Vec::new();
            }
        };

        let mut profiles: Vec<Profile> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .map(|path| {
                let full_path = std::path::absolute(&path).unwrap_or(path);
                Profile::from_path(full_path)
            })
            .collect();

        profiles.sort();
        debug!(
            dir = %profiles_dir.display(),
            count = profiles.len(),
            "Enumerated Skeinforge profiles"
        );
        profiles
    }

    /// Find the installed profile whose display name is `name`.
    pub fn find_profile(profiles_dir: &Path, name: &str) -> Option<Profile> {
        Self::list_profiles(profiles_dir)
            .into_iter()
            .find(|p| p.display_name() == name)
    }
}
