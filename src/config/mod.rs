//! Configuration management module for dialflow
//!
//! Layered configuration loading with support for:
//! - TOML configuration files
//! - Environment variable overrides
//! - Multiple environment configurations (development, test, staging, production)
//!
//! # Configuration Priority (lowest to highest)
//! 1. `config/default.toml` - Base default configuration
//! 2. `config/{environment}.toml` - Environment-specific configuration
//! 3. `config/local.toml` - Local development overrides (not committed)
//! 4. `DIALFLOW_*` environment variables

pub mod environment;
pub mod error;
pub mod loader;
pub mod settings;

pub use environment::Environment;
pub use loader::ConfigLoader;
pub use settings::{
    DatabaseConfig, EngineConfig, JwtConfig, ProvidersConfig, Settings, SmsGatewayConfig,
    VoiceGatewayConfig,
};
