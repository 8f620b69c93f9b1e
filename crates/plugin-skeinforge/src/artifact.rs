//! Expected output location of a generation run.

use std::path::Path;

use crate::models::BuildArtifact;

/// Extension Skeinforge gives its output. Must change together with the
/// toolchain's own output naming.
pub const GCODE_EXTENSION: &str = "gcode";

/// Derives the artifact path from the model path.
pub struct ArtifactResolver;

impl ArtifactResolver {
    /// Strip the model's extension (if any) and append `.gcode`.
    ///
    /// Only the file name is considered, so dots in directory names are
    /// left alone. The file is not checked for existence.
    pub fn resolve(model_path: &Path) -> BuildArtifact {
        let base_name = model_path.with_extension("");
        let mut output = base_name.clone().into_os_string();
        output.push(".");
        output.push(GCODE_EXTENSION);

        BuildArtifact {
            base_name,
            output_path: output.into(),
        }
    }
}
