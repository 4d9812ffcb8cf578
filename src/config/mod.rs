//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables with the
//! `config` and `dotenvy` crates. Variables use the `BILLING` prefix and
//! `__` between nested keys.
//!
//! # Example
//!
//! ```no_run
//! use plan_billing::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod gateway;
mod redis;
mod scheduler;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use gateway::GatewayConfig;
pub use redis::RedisConfig;
pub use scheduler::SchedulerConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    pub database: DatabaseConfig,

    /// Event publication (optional)
    #[serde(default)]
    pub redis: RedisConfig,

    pub gateway: GatewayConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// - `BILLING__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `BILLING__GATEWAY__ACCESS_TOKEN=...` -> `gateway.access_token = ...`
    ///
    /// A `.env` file is read first when present.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("BILLING")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.redis.validate()?;
        self.gateway.validate(&self.server.environment)?;
        self.scheduler.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: [&str; 7] = [
        "BILLING__DATABASE__URL",
        "BILLING__GATEWAY__ACCESS_TOKEN",
        "BILLING__GATEWAY__WEBHOOK_SECRET",
        "BILLING__SERVER__PORT",
        "BILLING__SERVER__ENVIRONMENT",
        "BILLING__SCHEDULER__INTERVAL_SECS",
        "BILLING__REDIS__URL",
    ];

    fn set_minimal_env() {
        env::set_var("BILLING__DATABASE__URL", "postgresql://test@localhost/billing");
        env::set_var("BILLING__GATEWAY__ACCESS_TOKEN", "APP_USR-test");
        env::set_var("BILLING__GATEWAY__WEBHOOK_SECRET", "whsec-test");
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/billing");
        assert_eq!(config.gateway.access_token, "APP_USR-test");
        assert!(!config.redis.is_configured());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_apply() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
        assert_eq!(config.scheduler.interval_secs, 300);
        assert_eq!(config.gateway.base_url, "https://api.mercadopago.com");
    }

    #[test]
    fn test_overrides_nested_values() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("BILLING__SERVER__PORT", "3000");
        env::set_var("BILLING__SERVER__ENVIRONMENT", "production");
        env::set_var("BILLING__SCHEDULER__INTERVAL_SECS", "60");
        env::set_var("BILLING__REDIS__URL", "redis://localhost:6379");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.environment, Environment::Production);
        assert_eq!(config.scheduler.interval_secs, 60);
        assert!(config.redis.is_configured());
    }

    #[test]
    fn test_missing_gateway_section_fails() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var("BILLING__DATABASE__URL", "postgresql://test@localhost/billing");
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_err());
    }
}
