//! Application configuration loaded from environment variables.
//!
//! Built once at process start and passed by `Arc` to every component that
//! needs it. There is no global settings singleton.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BOT_TOKEN` - Telegram bot token (also accepted as `TELOXIDE_TOKEN`)
//! - `PANEL_BASE_URL` - Public URL of the admin panel, used in `/admin` replies
//! - `ADMIN_TOKEN_SECRET` - HS256 signing secret for admin tokens
//!
//! ## Optional
//! - `DATABASE_PATH` - SQLite database file (default: database.sqlite)
//! - `PANEL_HOST` - Panel bind address (default: 127.0.0.1)
//! - `PANEL_PORT` - Panel listen port (default: 8080)
//! - `ADMIN_TOKEN_EXPIRES_MIN` - Token lifetime in minutes (default: 120)

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

/// Default admin-token lifetime in minutes.
pub const DEFAULT_TOKEN_EXPIRES_MIN: i64 = 120;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Telegram bot token
    pub bot_token: SecretString,
    /// SQLite database file path
    pub database_path: String,
    /// Public base URL of the admin panel
    pub panel_base_url: String,
    /// IP address the panel server binds to
    pub panel_host: IpAddr,
    /// Port the panel server listens on
    pub panel_port: u16,
    /// Signing secret for admin tokens
    pub token_secret: SecretString,
    /// Admin token lifetime in minutes
    pub token_expires_min: i64,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let bot_token = std::env::var("BOT_TOKEN")
            .or_else(|_| std::env::var("TELOXIDE_TOKEN"))
            .map(SecretString::from)
            .map_err(|_| ConfigError::MissingEnvVar("BOT_TOKEN".to_string()))?;

        let panel_base_url = get_required_env("PANEL_BASE_URL")?;
        url::Url::parse(&panel_base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("PANEL_BASE_URL".to_string(), e.to_string()))?;

        let panel_host = get_env_or_default("PANEL_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("PANEL_HOST".to_string(), e.to_string()))?;
        let panel_port = get_env_or_default("PANEL_PORT", "8080")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PANEL_PORT".to_string(), e.to_string()))?;

        let token_secret = get_required_env("ADMIN_TOKEN_SECRET").map(SecretString::from)?;
        let token_expires_min = get_env_or_default("ADMIN_TOKEN_EXPIRES_MIN", "120")
            .parse::<i64>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_TOKEN_EXPIRES_MIN".to_string(), e.to_string()))?;

        Ok(Self {
            bot_token,
            database_path: get_env_or_default("DATABASE_PATH", "database.sqlite"),
            panel_base_url,
            panel_host,
            panel_port,
            token_secret,
            token_expires_min,
        })
    }

    /// Returns the socket address for binding the panel server.
    pub fn panel_addr(&self) -> SocketAddr {
        SocketAddr::new(self.panel_host, self.panel_port)
    }

    /// Token lifetime rendered for chat messages ("2 h" / "90 min").
    pub fn token_lifetime_human(&self) -> String {
        if self.token_expires_min % 60 == 0 {
            format!("{} h", self.token_expires_min / 60)
        } else {
            format!("{} min", self.token_expires_min)
        }
    }
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn set_minimal_env() {
        std::env::set_var("BOT_TOKEN", "12345:test-token");
        std::env::set_var("PANEL_BASE_URL", "https://panel.example.com/");
        std::env::set_var("ADMIN_TOKEN_SECRET", "k8sJ2nQ9vX4mP7wL1bT6yR3eA5uC0hDz");
        std::env::remove_var("PANEL_HOST");
        std::env::remove_var("PANEL_PORT");
        std::env::remove_var("ADMIN_TOKEN_EXPIRES_MIN");
        std::env::remove_var("DATABASE_PATH");
    }

    #[test]
    #[serial]
    fn test_defaults() {
        set_minimal_env();
        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.database_path, "database.sqlite");
        assert_eq!(config.panel_port, 8080);
        assert_eq!(config.token_expires_min, 120);
        assert_eq!(config.panel_addr().to_string(), "127.0.0.1:8080");
    }

    #[test]
    #[serial]
    fn test_missing_secret_is_an_error() {
        set_minimal_env();
        std::env::remove_var("ADMIN_TOKEN_SECRET");
        let err = AppConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == "ADMIN_TOKEN_SECRET"));
    }

    #[test]
    #[serial]
    fn test_invalid_port_is_an_error() {
        set_minimal_env();
        std::env::set_var("PANEL_PORT", "not-a-port");
        let err = AppConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref v, _) if v == "PANEL_PORT"));
        std::env::remove_var("PANEL_PORT");
    }

    #[test]
    #[serial]
    fn test_token_lifetime_human() {
        set_minimal_env();
        let mut config = AppConfig::from_env().unwrap();
        assert_eq!(config.token_lifetime_human(), "2 h");
        config.token_expires_min = 90;
        assert_eq!(config.token_lifetime_human(), "90 min");
    }
}
