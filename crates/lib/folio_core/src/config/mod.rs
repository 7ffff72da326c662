//! Process configuration: secrets and token settings.
//!
//! Everything here is read once at startup and handed explicitly to the
//! components that need it. Nothing is compiled in.

pub mod secrets;

pub use secrets::SecretsConfig;

use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration value: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
