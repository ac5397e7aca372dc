//! Configuration management

use std::time::Duration;

use anyhow::{self, Context, Result};

use crate::services::roll_import::DEFAULT_BATCH_PAUSE;

/// Minimum JWT secret length in bytes.
const MIN_JWT_SECRET_BYTES: usize = 32;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// NATS server URL
    pub nats_url: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// JWT secret for token validation; only `serve` needs it
    pub jwt_secret: Option<String>,

    /// Pause between import batches
    pub batch_pause: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let nats_url = std::env::var("NATS_URL")
            .unwrap_or_else(|_| "nats://localhost:4222".to_string());

        let database_url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set")?;

        let jwt_secret = std::env::var("JWT_SECRET").ok().filter(|s| !s.is_empty());

        let batch_pause = match std::env::var("IMPORT_BATCH_PAUSE_MS") {
            Ok(ms) => Duration::from_millis(
                ms.trim()
                    .parse()
                    .with_context(|| format!("IMPORT_BATCH_PAUSE_MS is not a number: {}", ms))?,
            ),
            Err(_) => DEFAULT_BATCH_PAUSE,
        };

        Ok(Self {
            nats_url,
            database_url,
            jwt_secret,
            batch_pause,
        })
    }

    /// JWT secret for the NATS surface, checked for length.
    pub fn require_jwt_secret(&self) -> Result<&str> {
        let secret = self
            .jwt_secret
            .as_deref()
            .context("JWT_SECRET must be set; generate one with: openssl rand -base64 48")?;

        if secret.len() < MIN_JWT_SECRET_BYTES {
            anyhow::bail!(
                "JWT_SECRET must be at least {} bytes (current: {} bytes). Generate one with: openssl rand -base64 48",
                MIN_JWT_SECRET_BYTES,
                secret.len()
            );
        }
        Ok(secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(jwt_secret: Option<&str>) -> Config {
        Config {
            nats_url: "nats://localhost:4222".to_string(),
            database_url: "postgres://test".to_string(),
            jwt_secret: jwt_secret.map(str::to_string),
            batch_pause: DEFAULT_BATCH_PAUSE,
        }
    }

    #[test]
    fn test_missing_secret_rejected_for_serve() {
        assert!(config(None).require_jwt_secret().is_err());
    }

    #[test]
    fn test_short_secret_rejected() {
        let err = config(Some("short")).require_jwt_secret().unwrap_err();
        assert!(err.to_string().contains("at least 32 bytes"));
    }

    #[test]
    fn test_long_secret_accepted() {
        let secret = "test-secret-key-for-jwt-at-least-32-bytes-long";
        assert_eq!(config(Some(secret)).require_jwt_secret().unwrap(), secret);
    }

    #[test]
    #[ignore] // requires --test-threads=1 due to env var race
    fn test_batch_pause_from_env() {
        std::env::set_var("DATABASE_URL", "postgres://test");
        std::env::set_var("IMPORT_BATCH_PAUSE_MS", "0");

        let config = Config::from_env().unwrap();
        assert_eq!(config.batch_pause, Duration::ZERO);

        std::env::remove_var("IMPORT_BATCH_PAUSE_MS");
    }
}
