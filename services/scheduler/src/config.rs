//! services/scheduler/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

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
    /// `None` selects the in-memory stores.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub log_level: Level,
    pub generation_interval: Duration,
    pub generation_batch_size: usize,
    pub creation_shift: chrono::Duration,
}

const MAX_CREATION_SHIFT_HOURS: i64 = 168;

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Storage ---
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let db_max_connections: u32 = parse_positive(&lookup, "DB_MAX_CONNECTIONS", 5)?;

        // --- Logging ---
        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Generation daemon ---
        let interval_secs: u64 = parse_positive(&lookup, "GENERATION_INTERVAL_SECS", 3600)?;
        let generation_batch_size: usize = parse_positive(&lookup, "GENERATION_BATCH_SIZE", 100)?;

        let shift_hours: i64 = match lookup("CREATION_SHIFT_HOURS") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                ConfigError::InvalidValue(
                    "CREATION_SHIFT_HOURS".to_string(),
                    format!("'{raw}' is not an integer"),
                )
            })?,
            None => 24,
        };
        if !(0..=MAX_CREATION_SHIFT_HOURS).contains(&shift_hours) {
            return Err(ConfigError::InvalidValue(
                "CREATION_SHIFT_HOURS".to_string(),
                format!("must be within 0..={MAX_CREATION_SHIFT_HOURS}"),
            ));
        }

        Ok(Self {
            database_url,
            db_max_connections,
            log_level,
            generation_interval: Duration::from_secs(interval_secs),
            generation_batch_size,
            creation_shift: chrono::Duration::hours(shift_hours),
        })
    }
}

fn parse_positive<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(raw) = lookup(name) else {
        return Ok(default);
    };
    let value = raw.trim().parse::<T>().map_err(|_| {
        ConfigError::InvalidValue(name.to_string(), format!("'{raw}' is not a number"))
    })?;
    if value <= T::default() {
        return Err(ConfigError::InvalidValue(
            name.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_select_memory_store_and_hourly_ticks() {
        let config = load(&[]).unwrap();
        assert!(config.database_url.is_none());
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.generation_interval, Duration::from_secs(3600));
        assert_eq!(config.generation_batch_size, 100);
        assert_eq!(config.creation_shift, chrono::Duration::hours(24));
    }

    #[test]
    fn reads_overrides() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/intakes"),
            ("RUST_LOG", "debug"),
            ("GENERATION_INTERVAL_SECS", "60"),
            ("GENERATION_BATCH_SIZE", "10"),
            ("CREATION_SHIFT_HOURS", "30"),
        ])
        .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/intakes"));
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.generation_interval, Duration::from_secs(60));
        assert_eq!(config.generation_batch_size, 10);
        assert_eq!(config.creation_shift, chrono::Duration::hours(30));
    }

    #[test]
    fn rejects_invalid_values() {
        for vars in [
            [("GENERATION_INTERVAL_SECS", "0")],
            [("GENERATION_BATCH_SIZE", "lots")],
            [("CREATION_SHIFT_HOURS", "-1")],
            [("CREATION_SHIFT_HOURS", "200")],
            [("RUST_LOG", "chatty")],
        ] {
            assert!(matches!(load(&vars), Err(ConfigError::InvalidValue(..))), "{vars:?}");
        }
    }
}
