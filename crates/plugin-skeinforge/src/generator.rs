//! Skeinforge G-code generator: wires profile lookup, command building,
//! process orchestration and artifact resolution into one call.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use toolpath_core::config::toolchain::ToolchainConfig;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::artifact::ArtifactResolver;
use crate::command::CommandBuilder;
use crate::error::GeneratorError;
use crate::interpreter::{InterpreterProbe, InterpreterVersion, VersionRange};
use crate::models::{
    BuildArtifact, CapturedOutput, GenerationConfig, InvocationSpec, ProcessOutcome, Profile,
};
use crate::orchestrator::ProcessOrchestrator;
use crate::profiles::ProfileLocator;
use crate::sink::{LogSink, UpdateCallback};
use crate::toolchain::ToolchainLayout;

/// Everything known about one finished generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    /// Run identifier (UUIDv7).
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Wall time of the run.
    pub duration_ms: u64,
    /// The command that was run.
    pub invocation: InvocationSpec,
    /// How the run ended.
    pub outcome: ProcessOutcome,
    /// Expected G-code file; present exactly when `outcome` is success.
    pub artifact: Option<BuildArtifact>,
    /// Trailing output of the toolchain.
    pub output: CapturedOutput,
}

impl GenerationReport {
    /// Collapse into the caller's view: an artifact, nothing (cancelled), or
    /// a failure carrying the outcome summary.
    pub fn into_result(self) -> Result<Option<BuildArtifact>, GeneratorError> {
        match self.outcome {
            ProcessOutcome::Success => Ok(self.artifact),
            ProcessOutcome::Cancelled => Ok(None),
            ref failed => Err(GeneratorError::GenerationFailed {
                reason: failed.summary(),
            }),
        }
    }
}

/// Front door for G-code generation with Skeinforge.
#[derive(Debug, Clone)]
pub struct SkeinforgeGenerator {
    layout: ToolchainLayout,
    orchestrator: ProcessOrchestrator,
    interpreter_range: VersionRange,
}

impl SkeinforgeGenerator {
    /// Create a generator, resolving the toolchain root against the current
    /// working directory.
    pub fn new(config: &ToolchainConfig) -> Result<Self, GeneratorError> {
        let layout = ToolchainLayout::from_config(config)?;
        Self::with_layout(config, layout)
    }

    /// Create a generator for an already resolved layout.
    pub fn with_layout(
        config: &ToolchainConfig,
        layout: ToolchainLayout,
    ) -> Result<Self, GeneratorError> {
        let interpreter_range = VersionRange::parse(
            &config.min_interpreter_version,
            &config.max_interpreter_version,
        )?;

        Ok(Self {
            layout,
            orchestrator: ProcessOrchestrator::from_config(config),
            interpreter_range,
        })
    }

    /// The resolved toolchain layout.
    pub fn layout(&self) -> &ToolchainLayout {
        &self.layout
    }

    /// Installed profiles, sorted by name. Empty when none are installed.
    pub fn profiles(&self) -> Vec<Profile> {
        ProfileLocator::list_profiles(&self.layout.profiles_dir)
    }

    /// The installed profile called `name`.
    pub fn find_profile(&self, name: &str) -> Result<Profile, GeneratorError> {
        ProfileLocator::find_profile(&self.layout.profiles_dir, name).ok_or_else(|| {
            GeneratorError::ProfileNotInstalled {
                name: name.to_string(),
                profiles_dir: self.layout.profiles_dir.clone(),
            }
        })
    }

    /// Verify the interpreter exists and has a supported version.
    pub async fn check_interpreter(&self) -> Result<InterpreterVersion, GeneratorError> {
        InterpreterProbe::check(&self.layout.interpreter, self.interpreter_range).await
    }

    /// The command line a run with `config` on `model_path` would use.
    pub fn invocation(&self, config: &GenerationConfig, model_path: &Path) -> InvocationSpec {
        CommandBuilder::new(&self.layout).build(&config.profile(), config.use_raft(), model_path)
    }

    /// Generate G-code for `model_path`.
    ///
    /// Returns `Err` only when a precondition fails, before anything is
    /// spawned. Process failures and cancellation are reported through
    /// [`GenerationReport::outcome`].
    #[instrument(skip_all, fields(run_id, model = %model_path.display()))]
    pub async fn generate(
        &self,
        config: &GenerationConfig,
        model_path: &Path,
        sink: Arc<dyn LogSink>,
        on_update: Option<UpdateCallback>,
        cancel: CancellationToken,
    ) -> Result<GenerationReport, GeneratorError> {
        if model_path.as_os_str().is_empty() {
            return Err(GeneratorError::ModelPathEmpty);
        }

        let run_id = Uuid::now_v7();
        tracing::Span::current().record("run_id", run_id.to_string());
        let started_at = Utc::now();

        // The child runs inside the toolchain root, so a relative model path
        // must be anchored to our own working directory first.
        let model_path: PathBuf = std::path::absolute(model_path)?;
        let invocation = self.invocation(config, &model_path);

        info!(
            profile = %config.profile(),
            raft = config.use_raft(),
            "Generating G-code with Skeinforge"
        );

        let run = self
            .orchestrator
            .run(&invocation, sink, on_update, cancel)
            .await;

        if run.outcome.is_failure() {
            warn!(reason = %run.outcome.summary(), "G-code generation failed");
        } else if run.outcome == ProcessOutcome::Cancelled {
            info!("G-code generation cancelled");
        }
        let artifact = run
            .outcome
            .is_success()
            .then(|| ArtifactResolver::resolve(&model_path));

        Ok(GenerationReport {
            run_id,
            started_at,
            duration_ms: run.elapsed.as_millis() as u64,
            invocation,
            outcome: run.outcome,
            artifact,
            output: run.output,
        })
    }
}
