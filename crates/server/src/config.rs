use std::env;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub listen_addr: String,
    /// Base URL of the web client, used to build invite links.
    pub frontend_base_url: String,
    pub invite_ttl_hours: i64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable `{0}` is not set")]
    MissingVar(&'static str),
    #[error("invalid value for environment variable `{0}`")]
    InvalidVar(&'static str),
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("SERVER_DATABASE_URL")
            .or_else(|_| env::var("DATABASE_URL"))
            .map_err(|_| ConfigError::MissingVar("SERVER_DATABASE_URL"))?;

        let listen_addr =
            env::var("SERVER_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8081".to_string());

        let frontend_base_url =
            env::var("FRONTEND_BASE_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());

        let invite_ttl_hours = match env::var("INVITE_TTL_HOURS") {
            Ok(v) => v
                .parse()
                .map_err(|_| ConfigError::InvalidVar("INVITE_TTL_HOURS"))?,
            Err(_) => 24 * 7,
        };

        Ok(Self {
            database_url,
            listen_addr,
            frontend_base_url,
            invite_ttl_hours,
        })
    }
}
