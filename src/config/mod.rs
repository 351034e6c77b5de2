//! Configuration Module
//!
//! Loads and validates configuration from TOML files.

pub mod loader;

pub use loader::{
    ApiKeys, Config, ConfigError, DEFAULT_CONFIG_PATH, load_config, load_config_or_default,
};
