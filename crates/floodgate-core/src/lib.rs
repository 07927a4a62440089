//! Core infrastructure for floodgate.
//!
//! This crate provides shared functionality used across all floodgate crates:
//! - Event system for observability
//! - Runtime settings loaded from TOML files and environment variables

pub mod events;
pub mod settings;

pub use events::{EventListener, TelemetryEvent};
pub use settings::{PoolSettings, ResilienceSettings, Settings, SettingsError};
