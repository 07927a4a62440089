//! Runtime settings for the database access layer.
//!
//! Settings are read once at startup and are immutable afterwards. They can
//! come from a TOML file, from `FLOODGATE_*` environment variables, or both
//! (environment variables win). Every field has a default, so an empty
//! document is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings: {0}")]
    Parse(String),

    #[error("invalid value for {key}: {value}")]
    EnvVar { key: String, value: String },
}

/// Connection pool settings. Durations are expressed in milliseconds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PoolSettings {
    /// Upper bound on live connections, including ones being established.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Idle time after which a connection is retired by the health pass.
    #[serde(default = "default_max_idle_ms")]
    pub max_idle_ms: u64,

    /// Upper bound on queued acquisition requests.
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,

    /// How long a queued request waits before failing, unless the caller
    /// passes an explicit timeout.
    #[serde(default = "default_acquisition_timeout_ms")]
    pub acquisition_timeout_ms: u64,

    /// Age after which a connection is retired regardless of activity.
    #[serde(default = "default_max_lifetime_ms")]
    pub max_connection_lifetime_ms: u64,

    /// Interval between health maintenance passes.
    #[serde(default = "default_health_check_interval_ms")]
    pub health_check_interval_ms: u64,
}

fn default_max_connections() -> usize {
    10
}
fn default_max_idle_ms() -> u64 {
    60_000
}
fn default_max_queue_size() -> usize {
    100
}
fn default_acquisition_timeout_ms() -> u64 {
    5_000
}
fn default_max_lifetime_ms() -> u64 {
    3_600_000
}
fn default_health_check_interval_ms() -> u64 {
    30_000
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            max_idle_ms: default_max_idle_ms(),
            max_queue_size: default_max_queue_size(),
            acquisition_timeout_ms: default_acquisition_timeout_ms(),
            max_connection_lifetime_ms: default_max_lifetime_ms(),
            health_check_interval_ms: default_health_check_interval_ms(),
        }
    }
}

impl PoolSettings {
    pub fn max_idle_time(&self) -> Duration {
        Duration::from_millis(self.max_idle_ms)
    }

    pub fn acquisition_timeout(&self) -> Duration {
        Duration::from_millis(self.acquisition_timeout_ms)
    }

    pub fn max_connection_lifetime(&self) -> Duration {
        Duration::from_millis(self.max_connection_lifetime_ms)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }
}

/// Circuit breaker and retry settings for the resilient facade.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResilienceSettings {
    /// Consecutive failures that open the circuit.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// How long the circuit stays open before a probe is allowed through.
    #[serde(default = "default_circuit_reset_timeout_ms")]
    pub circuit_reset_timeout_ms: u64,

    /// Retries for operations classified as transient failures.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Fixed delay between retry attempts.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_failure_threshold() -> u32 {
    5
}
fn default_circuit_reset_timeout_ms() -> u64 {
    30_000
}
fn default_retries() -> u32 {
    2
}
fn default_retry_delay_ms() -> u64 {
    500
}

impl Default for ResilienceSettings {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            circuit_reset_timeout_ms: default_circuit_reset_timeout_ms(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl ResilienceSettings {
    pub fn circuit_reset_timeout(&self) -> Duration {
        Duration::from_millis(self.circuit_reset_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Top-level settings document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub pool: PoolSettings,

    #[serde(default)]
    pub resilience: ResilienceSettings,
}

impl Settings {
    /// Parses settings from a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, SettingsError> {
        toml::from_str(s).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    /// Reads settings from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Builds settings from defaults plus `FLOODGATE_*` environment variables.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::default().with_env_overrides()
    }

    /// Applies `FLOODGATE_*` environment variable overrides on top of `self`.
    pub fn with_env_overrides(mut self) -> Result<Self, SettingsError> {
        apply_env("FLOODGATE_MAX_CONNECTIONS", &mut self.pool.max_connections)?;
        apply_env("FLOODGATE_MAX_IDLE_MS", &mut self.pool.max_idle_ms)?;
        apply_env("FLOODGATE_MAX_QUEUE_SIZE", &mut self.pool.max_queue_size)?;
        apply_env(
            "FLOODGATE_ACQUISITION_TIMEOUT_MS",
            &mut self.pool.acquisition_timeout_ms,
        )?;
        apply_env(
            "FLOODGATE_MAX_CONNECTION_LIFETIME_MS",
            &mut self.pool.max_connection_lifetime_ms,
        )?;
        apply_env(
            "FLOODGATE_HEALTH_CHECK_INTERVAL_MS",
            &mut self.pool.health_check_interval_ms,
        )?;
        apply_env(
            "FLOODGATE_FAILURE_THRESHOLD",
            &mut self.resilience.failure_threshold,
        )?;
        apply_env(
            "FLOODGATE_CIRCUIT_RESET_TIMEOUT_MS",
            &mut self.resilience.circuit_reset_timeout_ms,
        )?;
        apply_env("FLOODGATE_RETRIES", &mut self.resilience.retries)?;
        apply_env(
            "FLOODGATE_RETRY_DELAY_MS",
            &mut self.resilience.retry_delay_ms,
        )?;
        Ok(self)
    }
}

fn apply_env<T: FromStr>(key: &str, slot: &mut T) -> Result<(), SettingsError> {
    match std::env::var(key) {
        Ok(raw) => {
            let parsed = raw.parse::<T>().map_err(|_| SettingsError::EnvVar {
                key: key.to_string(),
                value: raw.clone(),
            })?;
            *slot = parsed;
            Ok(())
        }
        Err(_) => Ok(()),
    }
}
