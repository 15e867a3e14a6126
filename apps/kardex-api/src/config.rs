//! Kardex API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable              | Default                  |
//! |-----------------------|--------------------------|
//! | `PORT`                | `5000`                   |
//! | `DATABASE_URL`        | `./kardex.db`            |
//! | `DB_MAX_CONNECTIONS`  | `5`                      |
//! | `JWT_SECRET`          | development secret       |
//! | `JWT_EXPIRY_SECS`     | `3600`                   |
//! | `CORS_ORIGIN`         | `http://localhost:5173`  |
//! | `EXPIRY_HORIZON_DAYS` | `30`                     |

use std::env;
use std::str::FromStr;

use kardex_core::EXPIRY_HORIZON_DAYS;
use tracing::warn;

const DEV_JWT_SECRET: &str = "kardex-dev-secret-change-in-production";

/// Kardex API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// HTTP listen port
    pub port: u16,

    /// SQLite database path (a `sqlite://` prefix is accepted and stripped)
    pub database_path: String,

    /// Connection pool size
    pub db_max_connections: u32,

    /// HS256 secret for signing tokens
    pub jwt_secret: String,

    /// Token lifetime in seconds
    pub jwt_expiry_secs: i64,

    /// Allowed browser origin
    pub cors_origin: String,

    /// Window of the "expiring soon" dashboard view, in days
    pub expiry_horizon_days: u64,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = match lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let database_path = lookup("DATABASE_URL").unwrap_or_else(|| "./kardex.db".to_string());
        let database_path = database_path
            .strip_prefix("sqlite://")
            .or_else(|| database_path.strip_prefix("sqlite:"))
            .unwrap_or(&database_path)
            .to_string();

        let config = ApiConfig {
            port: parse(&lookup, "PORT", 5000)?,
            database_path,
            db_max_connections: parse(&lookup, "DB_MAX_CONNECTIONS", 5)?,
            jwt_secret,
            jwt_expiry_secs: parse(&lookup, "JWT_EXPIRY_SECS", 3600)?,
            cors_origin: lookup("CORS_ORIGIN")
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
            expiry_horizon_days: parse(&lookup, "EXPIRY_HORIZON_DAYS", EXPIRY_HORIZON_DAYS as u64)?,
        };

        if config.jwt_expiry_secs <= 0 {
            return Err(ConfigError::InvalidValue("JWT_EXPIRY_SECS".to_string()));
        }
        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }

        Ok(config)
    }

    /// Returns the socket address to bind.
    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(pairs: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from(&[]).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.database_path, "./kardex.db");
        assert_eq!(config.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(config.jwt_expiry_secs, 3600);
        assert_eq!(config.expiry_horizon_days, 30);
        assert_eq!(config.bind_address(), "0.0.0.0:5000");
    }

    #[test]
    fn test_overrides_and_sqlite_prefix() {
        let config = from(&[
            ("PORT", "8080"),
            ("DATABASE_URL", "sqlite:///var/lib/kardex.db"),
            ("JWT_SECRET", "s3cr3t"),
            ("CORS_ORIGIN", "https://kardex.example"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_path, "/var/lib/kardex.db");
        assert_eq!(config.jwt_secret, "s3cr3t");
        assert_eq!(config.cors_origin, "https://kardex.example");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            from(&[("PORT", "abc")]),
            Err(ConfigError::InvalidValue(key)) if key == "PORT"
        ));
        assert!(from(&[("JWT_EXPIRY_SECS", "0")]).is_err());
        assert!(from(&[("DB_MAX_CONNECTIONS", "0")]).is_err());
    }
}
