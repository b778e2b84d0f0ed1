//! Configuration settings structures for dialflow
//!
//! All structures deserialize from TOML files and environment variables;
//! every field carries a serde default so partial configuration files work.

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;
use crate::logger::LoggerConfig;

// ============================================================================
// Default value functions
// ============================================================================

fn default_app_name() -> String {
    "dialflow".to_string()
}

fn default_app_version() -> String {
    crate::pkg_version().to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_keep_alive_timeout() -> u64 {
    75
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_access_token_expiration() -> i64 {
    1 // 1 hour
}

fn default_refresh_token_expiration() -> i64 {
    168 // 7 days (168 hours)
}

fn default_tick_seconds() -> u64 {
    30
}

fn default_recovery_sweep_seconds() -> u64 {
    300
}

fn default_processing_timeout_seconds() -> i64 {
    600
}

fn default_true() -> bool {
    true
}

fn default_smtp_timeout() -> u64 {
    30
}

fn default_agent_name() -> String {
    "ai".to_string()
}

// ============================================================================
// Application Configuration
// ============================================================================

/// Application basic information configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Application version
    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

// ============================================================================
// Server Configuration
// ============================================================================

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Keep-alive timeout in seconds
    #[serde(default = "default_keep_alive_timeout")]
    pub keep_alive_timeout: u64,
}

impl ServerConfig {
    /// Full bind address, e.g. `127.0.0.1:3000`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            keep_alive_timeout: default_keep_alive_timeout(),
        }
    }
}

// ============================================================================
// Database Configuration
// ============================================================================

/// PostgreSQL connection pool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DatabaseConfig {
    /// Connection URL (postgres://...)
    #[serde(default)]
    pub url: String,

    /// Maximum pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum idle connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,
}

impl DatabaseConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::Invalid {
                key: "database.url".to_string(),
                reason: "Database URL must be configured".to_string(),
            });
        }
        if !self.url.starts_with("postgres://") && !self.url.starts_with("postgresql://") {
            return Err(ConfigError::Invalid {
                key: "database.url".to_string(),
                reason: "Database URL must be a postgres:// URL".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// JWT Configuration
// ============================================================================

/// JWT validation configuration for the opaque identity provider.
///
/// dialflow only validates tokens; issuance lives in the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct JwtConfig {
    /// HMAC secret shared with the identity provider
    #[serde(default)]
    pub secret: String,

    /// Access token lifetime in hours
    #[serde(default = "default_access_token_expiration")]
    pub access_token_expiration: i64,

    /// Refresh token lifetime in hours
    #[serde(default = "default_refresh_token_expiration")]
    pub refresh_token_expiration: i64,
}

impl JwtConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.len() < 32 {
            return Err(ConfigError::Invalid {
                key: "jwt.secret".to_string(),
                reason: "JWT secret must be at least 32 characters".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Engine Configuration
// ============================================================================

/// Campaign execution engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Whether the engine starts with the server
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between execution loop ticks
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,

    /// Seconds between stuck-attempt recovery sweeps
    #[serde(default = "default_recovery_sweep_seconds")]
    pub recovery_sweep_seconds: u64,

    /// Age in seconds after which a `processing` attempt is considered
    /// stuck and released back to `queued`
    #[serde(default = "default_processing_timeout_seconds")]
    pub processing_timeout_seconds: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_seconds: default_tick_seconds(),
            recovery_sweep_seconds: default_recovery_sweep_seconds(),
            processing_timeout_seconds: default_processing_timeout_seconds(),
        }
    }
}

// ============================================================================
// Channel Provider Configuration
// ============================================================================

/// Voice dial gateway configuration (call placement API)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct VoiceGatewayConfig {
    /// Base URL of the dial gateway, e.g. `https://voice.example.com`
    #[serde(default)]
    pub base_url: String,

    /// API key sent as a bearer token
    #[serde(default)]
    pub api_key: String,

    /// Agent identity dispatched into the call
    #[serde(default = "default_agent_name")]
    pub agent_name: String,
}

/// SMS gateway configuration (Twilio-style Messages API)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SmsGatewayConfig {
    /// Base URL of the messaging API
    #[serde(default)]
    pub base_url: String,

    /// Account identifier (basic auth user)
    #[serde(default)]
    pub account_sid: String,

    /// Auth token (basic auth password)
    #[serde(default)]
    pub auth_token: String,

    /// Optional delivery status callback URL
    #[serde(default)]
    pub status_callback_url: Option<String>,
}

/// SMTP defaults applied when an email integration omits a value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpDefaults {
    /// Transport timeout in seconds
    #[serde(default = "default_smtp_timeout")]
    pub timeout_seconds: u64,
}

impl Default for SmtpDefaults {
    fn default() -> Self {
        Self {
            timeout_seconds: default_smtp_timeout(),
        }
    }
}

/// All channel provider configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub voice: VoiceGatewayConfig,

    #[serde(default)]
    pub sms: SmsGatewayConfig,

    #[serde(default)]
    pub smtp: SmtpDefaults,
}

// ============================================================================
// Root Settings
// ============================================================================

/// Root settings tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub application: ApplicationConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logger: LoggerConfig,

    #[serde(default)]
    pub jwt: JwtConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Settings {
    /// Validates the full tree; called before server startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid {
                key: "server.port".to_string(),
                reason: "Port must be non-zero".to_string(),
            });
        }
        self.database.validate()?;
        self.jwt.validate()?;
        if self.engine.tick_seconds == 0 {
            return Err(ConfigError::Invalid {
                key: "engine.tick_seconds".to_string(),
                reason: "Tick interval must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_settings() -> Settings {
        let mut settings = Settings::default();
        settings.database.url = "postgres://localhost/dialflow_test".to_string();
        settings.jwt.secret = "test_secret_key_at_least_32_characters_long".to_string();
        settings
    }

    #[test]
    fn default_settings_have_expected_values() {
        let settings = Settings::default();
        assert_eq!(settings.server.address(), "127.0.0.1:3000");
        assert_eq!(settings.engine.tick_seconds, 30);
        assert!(settings.engine.enabled);
    }

    #[test]
    fn validate_accepts_complete_settings() {
        assert!(valid_settings().validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_database_url() {
        let mut settings = valid_settings();
        settings.database.url = String::new();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validate_rejects_short_jwt_secret() {
        let mut settings = valid_settings();
        settings.jwt.secret = "short".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_port() {
        let mut settings = valid_settings();
        settings.server.port = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn settings_roundtrip_through_toml() {
        let settings = valid_settings();
        let serialized = toml::to_string(&settings).unwrap();
        let parsed: Settings = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed, settings);
    }
}
