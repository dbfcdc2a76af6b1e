//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_MEDIA_ROOT` - Directory for uploaded images (default: media)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag (default: development)
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: Url,
    /// Directory holding uploaded product images
    pub media_root: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: String,
    /// Emit JSON logs
    pub log_json: bool,
}

impl StorefrontConfig {
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

        Self::from_source(&|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_source(env: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = get_database_url(env, "STOREFRONT_DATABASE_URL")?;
        let host = get_env_or_default(env, "STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default(env, "STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_required_env(env, "STOREFRONT_BASE_URL")?;
        let base_url = Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string())
        })?;
        let media_root = PathBuf::from(get_env_or_default(env, "STOREFRONT_MEDIA_ROOT", "media"));

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            media_root,
            sentry_dsn: get_optional_env(env, "SENTRY_DSN"),
            sentry_environment: get_env_or_default(env, "SENTRY_ENVIRONMENT", "development"),
            log_json: get_optional_env(env, "LOG_FORMAT")
                .is_some_and(|v| v.eq_ignore_ascii_case("json")),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.scheme() == "https"
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(env: &dyn Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    get_optional_env(env, key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(
    env: &dyn Fn(&str) -> Option<String>,
    primary_key: &str,
) -> Result<SecretString, ConfigError> {
    get_optional_env(env, primary_key)
        .or_else(|| get_optional_env(env, "DATABASE_URL"))
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Blank values count as unset.
fn get_optional_env(env: &dyn Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    env(key).filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(env: &dyn Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    get_optional_env(env, key).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_source(&move |key: &str| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[
            ("STOREFRONT_DATABASE_URL", "postgres://localhost/pm"),
            ("STOREFRONT_BASE_URL", "http://localhost:3000"),
        ])
        .unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.media_root, PathBuf::from("media"));
        assert_eq!(config.sentry_environment, "development");
        assert!(config.sentry_dsn.is_none());
        assert!(!config.log_json);
        assert!(!config.is_https());
    }

    #[test]
    fn test_database_url_fallback() {
        let config = load(&[
            ("DATABASE_URL", "postgres://fallback/pm"),
            ("STOREFRONT_BASE_URL", "https://shop.example.com"),
            ("LOG_FORMAT", "JSON"),
        ])
        .unwrap();

        assert_eq!(config.database_url.expose_secret(), "postgres://fallback/pm");
        assert!(config.is_https());
        assert!(config.log_json);
    }

    #[test]
    fn test_missing_required() {
        let err = load(&[("STOREFRONT_BASE_URL", "http://localhost")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "STOREFRONT_DATABASE_URL"));

        let err = load(&[("DATABASE_URL", "postgres://x")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "STOREFRONT_BASE_URL"));
    }

    #[test]
    fn test_invalid_values() {
        let base = [
            ("DATABASE_URL", "postgres://x"),
            ("STOREFRONT_BASE_URL", "http://localhost"),
        ];

        let mut vars = base.to_vec();
        vars.push(("STOREFRONT_PORT", "eighty"));
        assert!(matches!(load(&vars), Err(ConfigError::InvalidEnvVar(..))));

        let mut vars = base.to_vec();
        vars.push(("STOREFRONT_HOST", "not-an-ip"));
        assert!(matches!(load(&vars), Err(ConfigError::InvalidEnvVar(..))));

        let vars = [("DATABASE_URL", "postgres://x"), ("STOREFRONT_BASE_URL", "not a url")];
        assert!(matches!(load(&vars), Err(ConfigError::InvalidEnvVar(..))));
    }
}
