use std::path::Path;

use log::debug;
use thiserror::Error;
use tokio::fs;

use crate::models::config_model::Config;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Can't parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Parses and validates a JSON configuration document.
pub fn parse_config(raw: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(raw)?;
    validate_config(&config)?;
    Ok(config)
}

pub async fn load_config(path: &Path) -> Result<Config, ConfigError> {
    debug!("Reading config from {}", path.display());
    let raw = fs::read_to_string(path).await?;
    parse_config(&raw)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.path.as_os_str().is_empty() {
        return Err(ConfigError::Invalid("output path must not be empty".to_string()));
    }

    for name in config.certs.keys() {
        if name.is_empty() {
            return Err(ConfigError::Invalid("service names must not be empty".to_string()));
        }
        if name.contains(['/', '\\']) {
            return Err(ConfigError::Invalid(format!(
                "service name {name:?} must not contain path separators"
            )));
        }
    }

    if config.fetch_timeout_secs == 0 {
        return Err(ConfigError::Invalid("fetch_timeout_secs must be greater than zero".to_string()));
    }

    Ok(())
}
