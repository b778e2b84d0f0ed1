//! Configuration error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown environment: {value}")]
    InvalidEnvironment { value: String },

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

impl From<ConfigError> for crate::error::AppError {
    fn from(error: ConfigError) -> Self {
        crate::error::AppError::Configuration {
            key: match &error {
                ConfigError::Invalid { key, .. } => key.clone(),
                ConfigError::InvalidEnvironment { .. } => "environment".to_string(),
                ConfigError::Load(_) => "config".to_string(),
            },
            source: anyhow::Error::from(error),
        }
    }
}
