//! Application configuration.
//!
//! Loaded from a TOML file with `STUBHOUND_`-prefixed environment variable
//! overrides. Each subsystem keeps its own config struct next to its code;
//! this module composes them into the root [`Config`].

mod loader;
mod types;

pub use loader::{load_config, load_config_from_str};
pub use types::{Config, DatabaseConfig};

use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(String),

    #[error("failed to parse config: {0}")]
    ParseError(String),
}
