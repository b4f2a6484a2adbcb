//! Error types for loading the reaction configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading or validating a config file.
///
/// Every variant is fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to open '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    #[error("address for the target appears invalid: {0:?}")]
    InvalidAddress(String),

    #[error("port for the target appears invalid: {0}")]
    InvalidPort(i64),

    #[error("target has no actions")]
    NoActions,

    #[error("action {index} is empty")]
    EmptyAction { index: usize },

    #[error("initial index {index} is out of range for {len} actions")]
    InitialIndexOutOfRange { index: i64, len: usize },
}
