//! Configuration inspection commands.

use clap::{Args, Subcommand};

use crate::output::{self, OutputFormat};
use toolpath_core::config::AppConfig;
use toolpath_core::AppResult;

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Show where the toolchain was resolved
    Toolchain,
}

/// Execute config commands
pub async fn execute(
    args: &ConfigArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> AppResult<()> {
    match &args.command {
        ConfigCommand::Show => output::print_item(config, format),
        ConfigCommand::Toolchain => {
            let generator = super::create_generator(config)?;
            let layout = generator.layout();
            match format {
                OutputFormat::Table => {
                    println!("{}", layout.summary());
                    output::print_kv("Root", &layout.root.display().to_string());
                    output::print_kv("Profiles", &layout.profiles_dir.display().to_string());
                    output::print_kv("Interpreter", &layout.interpreter);
                    output::print_kv("Entry script", &layout.entry_script);
                }
                OutputFormat::Json => output::print_item(layout, format),
            }
        }
    }
    Ok(())
}
