//! # Plugin Skeinforge
//!
//! Drives the Skeinforge toolchain (a Python program) to turn an STL model
//! into G-code. The toolchain itself is an external collaborator; this
//! crate builds the invocation, runs it as a child process while draining
//! both output streams concurrently, honours cancellation, and reports a
//! well-defined outcome together with the expected artifact path.
//!
//! ## Toolchain discovery
//!
//! The toolchain root is taken from `toolchain.path` (also settable as
//! `TOOLPATH__TOOLCHAIN__PATH`) and otherwise defaults to `./skeinforge`
//! relative to the process working directory.

pub mod artifact;
pub mod command;
pub mod drainer;
pub mod error;
pub mod generator;
pub mod interpreter;
pub mod models;
pub mod orchestrator;
pub mod preferences;
pub mod profiles;
pub mod sink;
pub mod toolchain;

pub use artifact::ArtifactResolver;
pub use command::CommandBuilder;
pub use error::GeneratorError;
pub use generator::{GenerationReport, SkeinforgeGenerator};
pub use models::{
    BuildArtifact, CapturedOutput, GenerationConfig, InvocationSpec, ProcessOutcome, ProcessRun,
    Profile,
};
pub use orchestrator::ProcessOrchestrator;
pub use sink::{LogSink, Severity, TracingSink, UpdateCallback};
pub use toolchain::ToolchainLayout;
