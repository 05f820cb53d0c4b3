//! # Adaptor Error Types
//!
//! Recoverable errors. Broken thread contracts are not errors, they panic.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while configuring the adaptor.
#[derive(Error, Debug)]
pub enum AdaptorError {
    /// A configuration value is outside its allowed range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration file could not be read.
    #[error("failed to read configuration file {path}: {source}")]
    ConfigRead {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`crate::EnvironmentOptions`].
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// An environment variable holds a value that cannot be parsed.
    #[error("environment variable {name} has invalid value {value:?}")]
    InvalidEnvironmentVariable {
        /// Variable name.
        name: &'static str,
        /// Raw value found in the environment.
        value: String,
    },
}

/// Result type for adaptor configuration.
pub type AdaptorResult<T> = Result<T, AdaptorError>;
