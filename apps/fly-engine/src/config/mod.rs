//! Configuration module for the fly engine.
//!
//! Provides YAML configuration loading with environment variable
//! interpolation and validation.
//!
//! # Usage
//!
//! ```rust,ignore
//! use fly_engine::config::{Config, load_config};
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! // Access configuration values
//! println!("per-fly stop: {}", config.stops.per_fly_stop);
//! ```

mod ladder;
mod persistence;
mod session;
mod stops;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use ladder::LadderConfig;
pub use persistence::PersistenceConfig;
pub use session::SessionConfig;
pub use stops::StopsConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Session schedule and underlying.
    #[serde(default)]
    pub session: SessionConfig,
    /// Ladder geometry.
    #[serde(default)]
    pub ladder: LadderConfig,
    /// Stop-loss thresholds.
    #[serde(default)]
    pub stops: StopsConfig,
    /// Snapshot persistence.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable
/// interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let mut result = input.to_string();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    for cap in re.captures_iter(input) {
        let Some(full_match) = cap.get(0) else {
            continue;
        };
        let Some(var_match) = cap.get(1) else {
            continue;
        };
        let full_match = full_match.as_str();
        let var_name = var_match.as_str();
        let default_value = cap.get(2).map(|m| m.as_str());

        let value = match std::env::var(var_name) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.map_or_else(String::new, str::to_string),
        };

        result = result.replace(full_match, &value);
    }

    result
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    use rust_decimal::Decimal;

    if config.session.entry_hour > 23 {
        return Err(ConfigError::ValidationError(
            "session.entry_hour must be 0-23".to_string(),
        ));
    }
    if config.session.entry_minute > 59 {
        return Err(ConfigError::ValidationError(
            "session.entry_minute must be 0-59".to_string(),
        ));
    }
    if config.session.cycle_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "session.cycle_interval_secs must be positive".to_string(),
        ));
    }

    if config.ladder.step <= Decimal::ZERO {
        return Err(ConfigError::ValidationError(
            "ladder.step must be positive".to_string(),
        ));
    }
    if config.ladder.width <= Decimal::ZERO {
        return Err(ConfigError::ValidationError(
            "ladder.width must be positive".to_string(),
        ));
    }
    if config.ladder.quantity <= Decimal::ZERO {
        return Err(ConfigError::ValidationError(
            "ladder.quantity must be positive".to_string(),
        ));
    }

    if config.stops.per_fly_stop <= Decimal::ZERO {
        return Err(ConfigError::ValidationError(
            "stops.per_fly_stop must be positive".to_string(),
        ));
    }
    if config.stops.portfolio_stop <= Decimal::ZERO {
        return Err(ConfigError::ValidationError(
            "stops.portfolio_stop must be positive".to_string(),
        ));
    }

    Ok(())
}
