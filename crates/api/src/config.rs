//! Application configuration

use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub bind_address: String,

    // Database
    pub database_url: String,
    pub database_max_connections: u32,

    // Authentication
    pub auth_secret: String,
    pub ephemeral_token_ttl_secs: u64,
    pub token_sweep_interval_secs: u64,

    // Realtime
    pub dispatch_queue_capacity: usize,
    pub shutdown_drain_timeout_secs: u64,

    // Logging
    pub log_json: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            // Server
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3001".to_string()),

            // Database
            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),

            // Authentication
            auth_secret: {
                let secret =
                    env::var("AUTH_SECRET").map_err(|_| ConfigError::Missing("AUTH_SECRET"))?;
                if secret.len() < 32 {
                    return Err(ConfigError::WeakSecret(
                        "AUTH_SECRET must be at least 32 characters",
                    ));
                }
                secret
            },
            ephemeral_token_ttl_secs: env::var("EPHEMERAL_TOKEN_TTL_SECS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .map_err(|_| ConfigError::Invalid("EPHEMERAL_TOKEN_TTL_SECS must be an integer"))?,
            token_sweep_interval_secs: env::var("TOKEN_SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),

            // Realtime
            dispatch_queue_capacity: env::var("DISPATCH_QUEUE_CAPACITY")
                .unwrap_or_else(|_| "256".to_string())
                .parse()
                .map_err(|_| ConfigError::Invalid("DISPATCH_QUEUE_CAPACITY must be an integer"))?,
            shutdown_drain_timeout_secs: env::var("SHUTDOWN_DRAIN_TIMEOUT_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::Invalid("SHUTDOWN_DRAIN_TIMEOUT_SECS must be an integer"))?,

            // Logging
            log_json: env::var("LOG_JSON")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
        };

        // Zero would make every token dead on arrival / the mpsc constructor panic
        if config.ephemeral_token_ttl_secs == 0 {
            return Err(ConfigError::Invalid("EPHEMERAL_TOKEN_TTL_SECS must be greater than 0"));
        }
        if config.dispatch_queue_capacity == 0 {
            return Err(ConfigError::Invalid("DISPATCH_QUEUE_CAPACITY must be greater than 0"));
        }

        Ok(config)
    }

    pub fn ephemeral_token_ttl(&self) -> Duration {
        Duration::from_secs(self.ephemeral_token_ttl_secs)
    }

    pub fn token_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.token_sweep_interval_secs.max(1))
    }

    /// How long shutdown waits for clients to answer the close frame
    pub fn shutdown_drain_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_drain_timeout_secs)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("Weak secret: {0}")]
    WeakSecret(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}
