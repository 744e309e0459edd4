//! Configuration loading from disk and environment.

use std::env;
use std::fs;
use std::path::Path;

use crate::config::schema::RelayConfig;
use crate::config::validation::ValidationError;

/// Environment variable consulted when the config file leaves the upstream
/// credential unset.
pub const UPSTREAM_PROXY_ENV: &str = "UPSTREAM_PROXY";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration from a TOML file and overlay the environment. With
/// no file, defaults plus environment apply.
///
/// Semantic validation runs separately, after the caller has applied any
/// command-line overrides.
pub fn load_config(path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => RelayConfig::default(),
    };

    apply_env(&mut config);

    Ok(config)
}

/// Fill environment-sourced settings into `config`.
///
/// Only the upstream credential comes from the environment; a value in the
/// config file wins over the variable.
pub fn apply_env(config: &mut RelayConfig) {
    if config.upstream.credential.is_none() {
        if let Ok(value) = env::var(UPSTREAM_PROXY_ENV) {
            if !value.trim().is_empty() {
                config.upstream.credential = Some(value);
            }
        }
    }
}
