//! G-code generation command.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use tokio_util::sync::CancellationToken;

use crate::output::{self, OutputFormat};
use plugin_skeinforge::preferences::{PreferenceStore, SlicingPreferences};
use plugin_skeinforge::{
    GenerationConfig, GeneratorError, ProcessOutcome, SkeinforgeGenerator, TracingSink,
    UpdateCallback,
};
use toolpath_core::config::AppConfig;
use toolpath_core::AppResult;

/// Arguments for the generate command
#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// STL model to convert
    pub model: PathBuf,

    /// Profile name (as listed by `profiles`) or profile directory;
    /// defaults to the last used profile
    #[arg(short, long)]
    pub profile: Option<String>,

    /// Lay down a raft under the print
    #[arg(long, conflicts_with = "no_raft")]
    pub raft: bool,

    /// Print without a raft
    #[arg(long)]
    pub no_raft: bool,

    /// Cancel the run after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Do not verify the interpreter version before running
    #[arg(long)]
    pub skip_interpreter_check: bool,
}

/// Execute the generate command
pub async fn execute(
    args: &GenerateArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> AppResult<()> {
    let generator = super::create_generator(config)?;
    let store = super::preference_store(config);
    let prefs = store.load()?;

    let profile_path = resolve_profile(&generator, args.profile.as_deref(), &prefs)?;
    let use_raft = if args.raft {
        true
    } else if args.no_raft {
        false
    } else {
        prefs.use_raft
    };
    let gen_config = GenerationConfig::new(profile_path, use_raft)?;

    if !args.skip_interpreter_check {
        generator.check_interpreter().await?;
    }

    let chosen = SlicingPreferences {
        profile_path: Some(gen_config.profile_path().to_path_buf()),
        use_raft,
    };
    if chosen != prefs {
        if let Err(e) = store.save(&chosen) {
            tracing::warn!(error = %e, "Could not remember profile choice");
        }
    }

    let cancel = CancellationToken::new();
    let watchers = spawn_cancel_watchers(&cancel, args.timeout);

    let on_update: Option<UpdateCallback> = match format {
        OutputFormat::Table => Some(Arc::new(|line: &str| output::print_progress(line))),
        OutputFormat::Json => None,
    };

    let result = generator
        .generate(
            &gen_config,
            &args.model,
            Arc::new(TracingSink),
            on_update,
            cancel,
        )
        .await;

    for watcher in watchers {
        watcher.abort();
    }

    let report = result?;

    match format {
        OutputFormat::Table => match &report.outcome {
            ProcessOutcome::Success => {
                if let Some(artifact) = &report.artifact {
                    output::print_success(&format!(
                        "G-code written to {}",
                        artifact.output_path.display()
                    ));
                }
            }
            ProcessOutcome::Cancelled => output::print_warning("Generation cancelled"),
            failed => {
                output::print_error(&format!("Generation failed: {}", failed.summary()));
                for line in &report.output.stderr {
                    eprintln!("    {}", line);
                }
            }
        },
        OutputFormat::Json => output::print_item(&report, format),
    }

    report.into_result()?;
    Ok(())
}

/// Pick the profile directory: explicit path, installed profile name, or the
/// remembered profile.
fn resolve_profile(
    generator: &SkeinforgeGenerator,
    requested: Option<&str>,
    prefs: &SlicingPreferences,
) -> Result<PathBuf, GeneratorError> {
    match requested {
        Some(value) if Path::new(value).is_dir() => Ok(PathBuf::from(value)),
        Some(name) => Ok(generator.find_profile(name)?.full_path().to_path_buf()),
        None => prefs.profile_path.clone().ok_or(GeneratorError::ProfileNotSet),
    }
}

/// Cancel on Ctrl-C, and after `timeout_secs` when given.
fn spawn_cancel_watchers(
    cancel: &CancellationToken,
    timeout_secs: Option<u64>,
) -> Vec<tokio::task::JoinHandle<()>> {
    let mut watchers = Vec::with_capacity(2);

    let token = cancel.clone();
    watchers.push(tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, cancelling generation");
            token.cancel();
        }
    }));

    if let Some(secs) = timeout_secs {
        let token = cancel.clone();
        watchers.push(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            tracing::warn!(timeout_s = secs, "Generation timed out, cancelling");
            token.cancel();
        }));
    }

    watchers
}
