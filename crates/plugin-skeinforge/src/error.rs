//! Error type for the Skeinforge generator.
//!
//! Only precondition failures and local I/O are errors here. Process-level
//! results (non-zero exit, launch failure, cancellation) are values of
//! [`crate::models::ProcessOutcome`] and never cross the orchestrator as
//! errors.

use std::path::PathBuf;

use thiserror::Error;
use toolpath_core::error::{AppError, ErrorKind};

/// Unified error type for toolpath generation.
#[derive(Debug, Error)]
pub enum GeneratorError {
    // --- Precondition errors ---
    /// No profile was chosen.
    #[error("No Skeinforge profile selected")]
    ProfileNotSet,

    /// The chosen profile path does not reference a directory.
    #[error("Profile directory not found: {path}")]
    ProfileNotFound {
        /// The configured profile path.
        path: PathBuf,
    },

    /// No installed profile carries the requested name.
    #[error("No installed profile named '{name}' in {profiles_dir}")]
    ProfileNotInstalled {
        /// The requested display name.
        name: String,
        /// The directory that was searched.
        profiles_dir: PathBuf,
    },

    /// The model path was empty.
    #[error("Model path is empty")]
    ModelPathEmpty,

    /// The interpreter could not be started.
    #[error("Interpreter '{interpreter}' could not be run: {reason}")]
    InterpreterNotFound {
        /// The interpreter executable name.
        interpreter: String,
        /// Description of the failure.
        reason: String,
    },

    /// The interpreter's version banner could not be parsed.
    #[error("Could not determine interpreter version from output: {output}")]
    InterpreterVersionUnreadable {
        /// What the interpreter printed.
        output: String,
    },

    /// The interpreter is outside the supported version range.
    #[error("Interpreter version {found} is not supported (need >= {min} and < {max})")]
    InterpreterVersionUnsupported {
        /// The detected version.
        found: String,
        /// Inclusive lower bound.
        min: String,
        /// Exclusive upper bound.
        max: String,
    },

    /// A configured version bound is malformed.
    #[error("Invalid version string in configuration: '{value}'")]
    InvalidVersion {
        /// The offending value.
        value: String,
    },

    // --- Run failures ---
    /// The toolchain run finished without producing an artifact.
    #[error("G-code generation failed: {reason}")]
    GenerationFailed {
        /// Summary of the process outcome.
        reason: String,
    },

    // --- Generic errors ---
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<GeneratorError> for AppError {
    fn from(err: GeneratorError) -> Self {
        match &err {
            GeneratorError::ProfileNotFound { .. } | GeneratorError::ProfileNotInstalled { .. } => {
                AppError::not_found(err.to_string())
            }
            GeneratorError::ProfileNotSet
            | GeneratorError::ModelPathEmpty
            | GeneratorError::InterpreterNotFound { .. }
            | GeneratorError::InterpreterVersionUnreadable { .. }
            | GeneratorError::InterpreterVersionUnsupported { .. } => {
                AppError::validation(err.to_string())
            }
            GeneratorError::InvalidVersion { .. } => AppError::configuration(err.to_string()),
            GeneratorError::GenerationFailed { .. } => AppError::external_service(err.to_string()),
            GeneratorError::Io(_) | GeneratorError::Json(_) => {
                let message = err.to_string();
                match err {
                    GeneratorError::Io(e) => AppError::with_source(ErrorKind::Storage, message, e),
                    GeneratorError::Json(e) => {
                        AppError::with_source(ErrorKind::Serialization, message, e)
                    }
                    other => AppError::new(ErrorKind::Storage, other.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_errors_map_to_validation() {
        let app: AppError = GeneratorError::ProfileNotSet.into();
        assert_eq!(app.kind, ErrorKind::Validation);

        let app: AppError = GeneratorError::ProfileNotFound {
            path: PathBuf::from("/missing"),
        }
        .into();
        assert_eq!(app.kind, ErrorKind::NotFound);
    }

    #[test]
    fn test_generation_failed_maps_to_external_service() {
        let app: AppError = GeneratorError::GenerationFailed {
            reason: "exit code 2".to_string(),
        }
        .into();
        assert_eq!(app.kind, ErrorKind::ExternalService);
        assert!(app.message.contains("exit code 2"));
    }

    #[test]
    fn test_io_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let app: AppError = GeneratorError::Io(io).into();
        assert_eq!(app.kind, ErrorKind::Storage);
        assert!(app.source.is_some());
    }
}
