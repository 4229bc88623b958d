//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub openweather_api_key: Option<String>,
    pub google_places_api_key: Option<String>,
    pub provider_timeout: Duration,
    pub push_write_timeout: Duration,
    pub notification_history_limit: usize,
    pub location_change_threshold_km: f64,
    pub temperature_change_threshold_c: i32,
    /// A single allowed CORS origin. `None` allows any origin.
    pub cors_allowed_origin: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8000)),
            log_level: Level::INFO,
            openweather_api_key: None,
            google_places_api_key: None,
            provider_timeout: Duration::from_secs(10),
            push_write_timeout: Duration::from_secs(5),
            notification_history_limit: 50,
            location_change_threshold_km: 0.25,
            temperature_change_threshold_c: 1,
            cors_allowed_origin: None,
        }
    }
}

/// Reads an optional variable, treating an empty value as unset.
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parses an optional variable, falling back to `default` when it is unset.
fn parsed_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_var(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        None => Ok(default),
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        let defaults = Self::default();

        // --- Load Server Settings ---
        let bind_address = parsed_var("BIND_ADDRESS", defaults.bind_address)?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load API Keys (as optional) ---
        let openweather_api_key = optional_var("OPENWEATHER_API_KEY");
        let google_places_api_key = optional_var("GOOGLE_PLACES_API_KEY");

        // --- Load Engine Settings ---
        let provider_timeout = Duration::from_secs(parsed_var("PROVIDER_TIMEOUT_SECS", 10u64)?);
        let push_write_timeout =
            Duration::from_secs(parsed_var("PUSH_WRITE_TIMEOUT_SECS", 5u64)?);

        let notification_history_limit = parsed_var(
            "NOTIFICATION_HISTORY_LIMIT",
            defaults.notification_history_limit,
        )?;
        if notification_history_limit == 0 {
            return Err(ConfigError::InvalidValue(
                "NOTIFICATION_HISTORY_LIMIT".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let location_change_threshold_km = parsed_var(
            "LOCATION_CHANGE_THRESHOLD_KM",
            defaults.location_change_threshold_km,
        )?;
        if !location_change_threshold_km.is_finite() || location_change_threshold_km < 0.0 {
            return Err(ConfigError::InvalidValue(
                "LOCATION_CHANGE_THRESHOLD_KM".to_string(),
                "must be a non-negative number".to_string(),
            ));
        }

        let temperature_change_threshold_c = parsed_var(
            "TEMPERATURE_CHANGE_THRESHOLD_C",
            defaults.temperature_change_threshold_c,
        )?;

        let cors_allowed_origin = optional_var("CORS_ALLOWED_ORIGIN");

        Ok(Self {
            bind_address,
            log_level,
            openweather_api_key,
            google_places_api_key,
            provider_timeout,
            push_write_timeout,
            notification_history_limit,
            location_change_threshold_km,
            temperature_change_threshold_c,
            cors_allowed_origin,
        })
    }
}
