// Error types for Bootstrap module

use crate::bootstrap::types::Outcome;
use std::path::PathBuf;
use thiserror::Error;

/// Unexpected errors raised by a strategy, outside its normal failure path
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("Failed to launch script '{}': {source}", path.display())]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Working directory '{}' unusable: {source}", path.display())]
    WorkingDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed waiting for script '{}': {source}", path.display())]
    Wait {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to terminate script '{}' after timeout: {source}", path.display())]
    Terminate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Strategy error: {0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Raised by the gate when the spawn for a user must be aborted
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Bootstrap failed for user '{user}' ({outcome}), error cannot be ignored")]
    Failed { user: String, outcome: Outcome },

    #[error("Bootstrap failed with error for user '{user}', cannot be ignored")]
    Errored {
        user: String,
        #[source]
        source: StrategyError,
    },
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Unknown bootstrap class: {0}")]
    UnknownStrategy(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, BootstrapError>;
