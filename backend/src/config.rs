//! Configuration management for BizManager
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with BIZ_ prefix (BIZ__JWT__SECRET, ...)

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::i18n::Language;

const DEFAULT_ADMIN_PIN: &str = "1234";

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// PIN login configuration
    pub auth: AuthConfig,

    /// Change notification fan-out
    pub realtime: RealtimeConfig,

    /// Business defaults
    pub business: BusinessConfig,

    /// Log output
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Run embedded migrations on startup
    pub run_migrations: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,

    /// Refresh token expiration in seconds
    pub refresh_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Name of the admin created when the users table is empty
    pub bootstrap_admin_name: String,

    /// PIN of that admin; change it right after first login
    pub bootstrap_admin_pin: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RealtimeConfig {
    /// Postgres NOTIFY channel the triggers publish on
    pub channel: String,

    /// Events buffered per subscriber before the slowest one lags
    pub buffer: usize,

    /// Seconds to wait before listening again after a failure
    pub reconnect_delay_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessConfig {
    /// Display name used in exports
    pub name: String,

    /// Language used when a request does not ask for one
    pub default_language: Language,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    /// "pretty" or "json"
    pub format: String,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("BIZ_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.run_migrations", environment == "development")?
            .set_default("jwt.access_token_expiry", 3600)?
            .set_default("jwt.refresh_token_expiry", 604800)?
            .set_default("auth.bootstrap_admin_name", "Admin")?
            .set_default("auth.bootstrap_admin_pin", DEFAULT_ADMIN_PIN)?
            .set_default("realtime.channel", "bizmanager_changes")?
            .set_default("realtime.buffer", 256)?
            .set_default("realtime.reconnect_delay_secs", 5)?
            .set_default("business.name", "BizManager")?
            .set_default("business.default_language", "en")?
            .set_default("log.format", "pretty")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (BIZ_ prefix)
            .add_source(
                Environment::with_prefix("BIZ")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.check()?;
        Ok(config)
    }

    /// Reject settings the server cannot run with
    fn check(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.len() < 16 {
            return Err(ConfigError::Message(
                "jwt.secret must be at least 16 characters".to_string(),
            ));
        }
        shared::validation::check_pin(&self.auth.bootstrap_admin_pin)
            .map_err(|e| ConfigError::Message(format!("auth.bootstrap_admin_pin: {}", e)))?;
        if self.realtime.buffer == 0 {
            return Err(ConfigError::Message("realtime.buffer must be positive".to_string()));
        }
        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Whether the bootstrap admin still uses the built-in PIN
    pub fn uses_default_admin_pin(&self) -> bool {
        self.auth.bootstrap_admin_pin == DEFAULT_ADMIN_PIN
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}
