//! Logging initialization built on tracing-subscriber.
//!
//! Supports console and file outputs with pretty/compact/JSON formats and
//! env-filter style level directives.

mod config;

pub use config::{ConsoleConfig, FileConfig, LogFormat, LoggerConfig};

use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::error::{AppError, AppResult};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

fn console_layer(format: LogFormat) -> BoxedLayer {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer().pretty().boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer().compact().boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
    }
}

fn file_layer(format: LogFormat, path: &str) -> AppResult<BoxedLayer> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Configuration {
                key: "logger.file.path".to_string(),
                source: anyhow::Error::from(e),
            })?;
        }
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| AppError::Configuration {
            key: "logger.file.path".to_string(),
            source: anyhow::Error::from(e),
        })?;
    let writer = Arc::new(file);

    let layer = match format {
        LogFormat::Pretty | LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_ansi(false)
            .with_writer(writer)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(writer)
            .boxed(),
    };
    Ok(layer)
}

/// Initializes the global tracing subscriber from configuration.
///
/// Returns an error if a file output cannot be opened or a subscriber is
/// already installed (e.g. calling twice in one process).
pub fn init_logger(config: &LoggerConfig) -> AppResult<()> {
    let filter =
        EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if config.console.enabled {
        layers.push(console_layer(config.format));
    }
    if config.file.enabled {
        layers.push(file_layer(config.format, &config.file.path)?);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| AppError::Configuration {
            key: "logger".to_string(),
            source: anyhow::anyhow!("Failed to install tracing subscriber: {}", e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_layer_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/app.log");
        let layer = file_layer(LogFormat::Json, path.to_str().unwrap());
        assert!(layer.is_ok());
        assert!(path.parent().unwrap().exists());
    }
}
