//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::schema::{RawStackConfig, StackConfig};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required section is absent.
    #[error("configuration section [{section}] is missing")]
    Missing { section: &'static str },
}

impl TryFrom<RawStackConfig> for StackConfig {
    type Error = ConfigError;

    fn try_from(raw: RawStackConfig) -> Result<Self, Self::Error> {
        let litellm = raw.litellm.ok_or(ConfigError::Missing { section: "litellm" })?;
        let postgres = raw.postgres.ok_or(ConfigError::Missing { section: "postgres" })?;
        let gateway = raw.gateway.ok_or(ConfigError::Missing { section: "gateway" })?;

        Ok(Self {
            litellm,
            postgres,
            gateway,
            services: raw.services,
            observability: raw.observability,
        })
    }
}

/// Parse configuration from TOML text.
///
/// A `[litellm]` table without `general_settings` is reported as the missing
/// `litellm.general_settings` section rather than a parse error.
pub fn parse_config(content: &str) -> Result<StackConfig, ConfigError> {
    let table: toml::Table = content.parse()?;
    if let Some(litellm) = table.get("litellm").and_then(toml::Value::as_table) {
        if !litellm.contains_key("general_settings") {
            return Err(ConfigError::Missing {
                section: "litellm.general_settings",
            });
        }
    }

    let raw: RawStackConfig = table.try_into()?;
    StackConfig::try_from(raw)
}

/// Load configuration from a TOML file.
///
/// Semantic validation is left to [`crate::config::validation`] so that
/// the startup pipeline can report its failures separately.
pub fn load_config(path: &Path) -> Result<StackConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&content)?;

    tracing::debug!(
        path = %path.display(),
        models = config.litellm.model_list.len(),
        routes = config.gateway.routes.len(),
        services = config.services.len(),
        "Configuration parsed"
    );

    Ok(config)
}
