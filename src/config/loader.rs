//! Layered configuration loading.
//!
//! Merges TOML files and `DIALFLOW_*` environment variables into a
//! `Settings` tree. File layers are optional so a bare environment-variable
//! deployment works out of the box.

use std::path::{Path, PathBuf};

use config::{Config, File};

use crate::config::environment::Environment;
use crate::config::error::ConfigError;
use crate::config::settings::Settings;

/// Loads settings from the conventional config directory plus environment
/// variable overrides.
pub struct ConfigLoader {
    config_dir: PathBuf,
    environment: Environment,
    explicit_file: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new(environment: Environment) -> Self {
        Self {
            config_dir: PathBuf::from("config"),
            environment,
            explicit_file: None,
        }
    }

    /// Overrides the directory config files are read from.
    pub fn with_config_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Uses a single explicit config file instead of the layered directory.
    pub fn with_file(mut self, file: impl AsRef<Path>) -> Self {
        self.explicit_file = Some(file.as_ref().to_path_buf());
        self
    }

    /// Builds the merged `Settings`.
    ///
    /// Layer order (lowest to highest priority): `default.toml`,
    /// `{environment}.toml`, `local.toml`, `DIALFLOW_*` env vars with `__`
    /// as the section separator (e.g. `DIALFLOW_SERVER__PORT=8080`).
    pub fn load(&self) -> Result<Settings, ConfigError> {
        let mut builder = Config::builder();

        if let Some(file) = &self.explicit_file {
            builder = builder.add_source(File::from(file.as_path()));
        } else {
            builder = builder
                .add_source(File::from(self.config_dir.join("default")).required(false))
                .add_source(
                    File::from(self.config_dir.join(self.environment.as_str())).required(false),
                )
                .add_source(File::from(self.config_dir.join("local")).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("DIALFLOW")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }
}
