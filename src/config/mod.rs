use crate::error::{Result, RoutecraftError};
use crate::middleware::RateLimitConfig;
use dashmap::DashMap;
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use strum_macros::{Display, EnumString};

/// Configuration service
///
/// A snapshot of key/value settings, seeded from the process environment.
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    pub fn new() -> Self {
        let service = Self::default();
        for (key, value) in env::vars() {
            service.set(&key, &value);
        }
        service
    }

    /// Load `path` as a dotenv file into the environment (existing variables
    /// win), then snapshot the environment. A missing file is not an error.
    pub fn from_env_file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match dotenvy::from_path(path) {
            Ok(()) => tracing::debug!("Loaded configuration from {}", path.display()),
            Err(e) if e.not_found() => {
                tracing::debug!("No configuration file at {}", path.display())
            }
            Err(e) => tracing::warn!("Ignoring configuration file {}: {}", path.display(), e),
        }
        Self::new()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }

    /// Parse `key` if present, falling back to `default` when it is unset.
    pub fn parse_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e: T::Err| RoutecraftError::config(key, e.to_string())),
            None => Ok(default),
        }
    }
}

/// Deployment environment; decides how much error detail clients see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// Typed application settings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub environment: Environment,
    /// Maximum accepted request body, in bytes.
    pub body_limit: usize,
    pub rate_limit: RateLimitConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            environment: Environment::Development,
            body_limit: 10 * 1024,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl AppConfig {
    /// Build from `PORT`, `APP_ENV`, `BODY_LIMIT_BYTES`, `RATE_LIMIT_MAX` and
    /// `RATE_LIMIT_WINDOW_SECS`.
    pub fn from_service(service: &ConfigService) -> Result<Self> {
        let defaults = Self::default();
        let window_secs =
            service.parse_or("RATE_LIMIT_WINDOW_SECS", defaults.rate_limit.window.as_secs())?;
        Ok(Self {
            port: service.parse_or("PORT", defaults.port)?,
            environment: service.parse_or("APP_ENV", defaults.environment)?,
            body_limit: service.parse_or("BODY_LIMIT_BYTES", defaults.body_limit)?,
            rate_limit: RateLimitConfig {
                max_requests: service
                    .parse_or("RATE_LIMIT_MAX", defaults.rate_limit.max_requests)?,
                window: Duration::from_secs(window_secs),
                ..defaults.rate_limit
            },
        })
    }
}
