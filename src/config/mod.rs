//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `LOBBY_HUB` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use lobby_hub::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Rooms hold {} players", config.hub.room_capacity);
//! ```

mod error;
mod hub;
mod server;

pub use error::{ConfigError, ValidationError};
pub use hub::HubConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Every section has defaults, so an empty environment yields a runnable
/// configuration. Load using [`AppConfig::load()`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging, CORS)
    #[serde(default)]
    pub server: ServerConfig,

    /// Room and connection settings
    #[serde(default)]
    pub hub: HubConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `LOBBY_HUB` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `LOBBY_HUB__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `LOBBY_HUB__HUB__ROOM_CAPACITY=6` -> `hub.room_capacity = 6`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("LOBBY_HUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid value found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.hub.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        env::remove_var("LOBBY_HUB__SERVER__PORT");
        env::remove_var("LOBBY_HUB__SERVER__ENVIRONMENT");
        env::remove_var("LOBBY_HUB__HUB__ROOM_CAPACITY");
        env::remove_var("LOBBY_HUB__HUB__PONG_WAIT_SECS");
    }

    #[test]
    fn test_load_with_empty_environment_uses_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let result = AppConfig::load();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.hub.room_capacity, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_is_production() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("LOBBY_HUB__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
    }

    #[test]
    fn test_hub_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("LOBBY_HUB__SERVER__PORT", "3000");
        env::set_var("LOBBY_HUB__HUB__ROOM_CAPACITY", "6");
        env::set_var("LOBBY_HUB__HUB__PONG_WAIT_SECS", "20");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.hub.room_capacity, 6);
        assert_eq!(config.hub.ping_period().as_secs(), 18);
    }

    #[test]
    fn test_invalid_hub_value_fails_validation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("LOBBY_HUB__HUB__ROOM_CAPACITY", "0");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidRoomCapacity)
        ));
    }
}
