//! CLI command definitions and dispatch.

pub mod config;
pub mod generate;
pub mod interpreter;
pub mod profiles;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use plugin_skeinforge::SkeinforgeGenerator;
use plugin_skeinforge::preferences::JsonPreferenceStore;
use toolpath_core::config::AppConfig;
use toolpath_core::AppResult;

/// Toolpath: STL to G-code generation with Skeinforge
#[derive(Debug, Parser)]
#[command(name = "toolpath", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List installed Skeinforge profiles
    Profiles,
    /// Generate G-code for a model
    Generate(generate::GenerateArgs),
    /// Check the interpreter used to run Skeinforge
    CheckInterpreter,
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> AppResult<()> {
        match &self.command {
            Commands::Profiles => profiles::execute(&config, self.format).await,
            Commands::Generate(args) => generate::execute(args, &config, self.format).await,
            Commands::CheckInterpreter => interpreter::execute(&config, self.format).await,
            Commands::Config(args) => config::execute(args, &config, self.format).await,
        }
    }
}

/// Helper: build the generator from configuration
pub fn create_generator(config: &AppConfig) -> AppResult<SkeinforgeGenerator> {
    Ok(SkeinforgeGenerator::new(&config.toolchain)?)
}

/// Helper: open the preference store from configuration
pub fn preference_store(config: &AppConfig) -> JsonPreferenceStore {
    JsonPreferenceStore::new(&config.preferences.file)
}
