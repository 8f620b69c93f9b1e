//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section; every field carries a default so an empty file is valid.

pub mod logging;
pub mod preferences;
pub mod toolchain;

use serde::{Deserialize, Serialize};
use validator::Validate;

use self::logging::LoggingConfig;
use self::preferences::PreferencesConfig;
use self::toolchain::ToolchainConfig;

use crate::error::AppError;
use crate::result::AppResult;

/// Prefix for environment variable overrides, e.g.
/// `TOOLPATH__TOOLCHAIN__PATH=/opt/skeinforge`.
pub const ENV_PREFIX: &str = "TOOLPATH";

/// Root application configuration.
///
/// Top-level deserialization target for the merged configuration
/// (base file + environment overlay + `TOOLPATH__*` variables).
#[derive(Debug, Clone, Default, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Logging settings.
    #[validate(nested)]
    pub logging: LoggingConfig,
    /// External toolchain settings.
    #[validate(nested)]
    pub toolchain: ToolchainConfig,
    /// Persisted preference settings.
    pub preferences: PreferencesConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// `path` is the base file (optional on disk). An environment-specific
    /// overlay at `config/<env>.toml` and environment variables prefixed
    /// with `TOOLPATH__` are merged on top, in that order.
    pub fn load(path: &str, env: &str) -> AppResult<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let app: AppConfig = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        app.validate()?;
        Ok(app)
    }
}
