//! Logger configuration structures.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

fn default_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_path() -> String {
    "logs/dialflow.log".to_string()
}

/// Output format for log events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output
    #[default]
    Pretty,
    /// Single-line output
    Compact,
    /// Newline-delimited JSON
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("Unknown log format: {}", other)),
        }
    }
}

/// Console output configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// File output configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_log_path")]
    pub path: String,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_log_path(),
        }
    }
}

/// Root logger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Log level or full env-filter directive (e.g. `info,dialflow=debug`)
    #[serde(default = "default_level")]
    pub level: String,

    /// Event format applied to all outputs
    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub console: ConsoleConfig,

    #[serde(default)]
    pub file: FileConfig,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            console: ConsoleConfig::default(),
            file: FileConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn defaults_log_to_console_only() {
        let config = LoggerConfig::default();
        assert!(config.console.enabled);
        assert!(!config.file.enabled);
        assert_eq!(config.level, "info");
    }
}
