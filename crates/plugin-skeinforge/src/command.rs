//! Skeinforge command-line construction.
//!
//! The toolchain parses its arguments positionally, so the order produced
//! here is fixed:
//!
//! ```text
//! <interpreter> -u <entry-script> -p <profile> (--raft | --no-raft) <model>
//! ```

use std::path::Path;

use crate::models::{InvocationSpec, Profile};
use crate::toolchain::ToolchainLayout;

/// Interpreter flag that disables output buffering so progress lines
/// arrive as they are printed.
pub const UNBUFFERED_FLAG: &str = "-u";
/// Profile selection flag.
pub const PROFILE_FLAG: &str = "-p";
/// Request a raft.
pub const RAFT_FLAG: &str = "--raft";
/// Suppress the raft.
pub const NO_RAFT_FLAG: &str = "--no-raft";

/// Builds [`InvocationSpec`] values for a resolved toolchain.
#[derive(Debug, Clone)]
pub struct CommandBuilder<'a> {
    layout: &'a ToolchainLayout,
}

impl<'a> CommandBuilder<'a> {
    /// Create a builder for the given toolchain layout.
    pub fn new(layout: &'a ToolchainLayout) -> Self {
        Self { layout }
    }

    /// Build the invocation for one run. Performs no I/O.
    pub fn build(&self, profile: &Profile, use_raft: bool, model_path: &Path) -> InvocationSpec {
        let raft = if use_raft { RAFT_FLAG } else { NO_RAFT_FLAG };

        let arguments = vec![
            UNBUFFERED_FLAG.to_string(),
            self.layout.entry_script.clone(),
            PROFILE_FLAG.to_string(),
            profile.full_path().to_string_lossy().into_owned(),
            raft.to_string(),
            model_path.to_string_lossy().into_owned(),
        ];

        InvocationSpec {
            executable: self.layout.interpreter.clone(),
            arguments,
            working_directory: self.layout.root.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolchain::RootSource;
    use std::path::PathBuf;

    fn layout() -> ToolchainLayout {
        ToolchainLayout {
            root: PathBuf::from("/opt/skeinforge"),
            interpreter: "python".to_string(),
            entry_script: "skeinforge.py".to_string(),
            profiles_dir: PathBuf::from("/opt/skeinforge/prefs"),
            source: RootSource::ExplicitConfig,
        }
    }

    #[test]
    fn test_argument_order_with_raft() {
        let layout = layout();
        let profile = Profile::from_path("/opt/skeinforge/prefs/SF35-cupcake");
        let spec = CommandBuilder::new(&layout).build(&profile, true, Path::new("/tmp/part.stl"));

        assert_eq!(spec.executable, "python");
        assert_eq!(
            spec.arguments,
            vec![
                "-u",
                "skeinforge.py",
                "-p",
                "/opt/skeinforge/prefs/SF35-cupcake",
                "--raft",
                "/tmp/part.stl",
            ]
        );
        assert_eq!(spec.working_directory, PathBuf::from("/opt/skeinforge"));
    }

    #[test]
    fn test_no_raft_flag() {
        let layout = layout();
        let profile = Profile::from_path("/opt/skeinforge/prefs/SF35-cupcake");
        let spec = CommandBuilder::new(&layout).build(&profile, false, Path::new("/tmp/part.stl"));
        assert_eq!(spec.arguments[4], "--no-raft");
        assert_eq!(spec.arguments.len(), 6);
    }

    #[test]
    fn test_build_is_idempotent() {
        let layout = layout();
        let builder = CommandBuilder::new(&layout);
        let profile = Profile::from_path("/opt/skeinforge/prefs/SF35-cupcake");
        let first = builder.build(&profile, true, Path::new("/models/gear.stl"));
        let second = builder.build(&profile, true, Path::new("/models/gear.stl"));
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first).expect("json"),
            serde_json::to_vec(&second).expect("json")
        );
    }

    #[test]
    fn test_display_renders_command_line() {
        let layout = layout();
        let profile = Profile::from_path("/p/x");
        let spec = CommandBuilder::new(&layout).build(&profile, false, Path::new("m.stl"));
        assert_eq!(
            spec.to_string(),
            "python -u skeinforge.py -p /p/x --no-raft m.stl"
        );
    }
}
