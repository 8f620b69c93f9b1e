//! Interpreter check command.

use serde::Serialize;

use crate::output::{self, OutputFormat};
use toolpath_core::config::AppConfig;
use toolpath_core::AppResult;

/// Result of the interpreter check
#[derive(Debug, Serialize)]
struct InterpreterReport {
    interpreter: String,
    version: String,
    supported_range: String,
}

/// Execute the check-interpreter command
pub async fn execute(config: &AppConfig, format: OutputFormat) -> AppResult<()> {
    let generator = super::create_generator(config)?;
    let version = generator.check_interpreter().await?;

    let report = InterpreterReport {
        interpreter: generator.layout().interpreter.clone(),
        version: version.to_string(),
        supported_range: format!(
            ">= {}, < {}",
            config.toolchain.min_interpreter_version, config.toolchain.max_interpreter_version
        ),
    };

    match format {
        OutputFormat::Table => {
            output::print_success("Interpreter is supported");
            output::print_kv("Interpreter", &report.interpreter);
            output::print_kv("Version", &report.version);
            output::print_kv("Supported", &report.supported_range);
        }
        OutputFormat::Json => output::print_item(&report, format),
    }
    Ok(())
}
