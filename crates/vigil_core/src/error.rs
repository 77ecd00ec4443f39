//! # Engine Error Types
//!
//! Errors only surface at construction. The event path degrades to
//! "no verdict" instead of returning them.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config text is not valid TOML for the expected shape.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A section names a check that does not exist.
    #[error("unknown check section [checks.{0}]")]
    UnknownSection(String),

    /// A value is out of its allowed range.
    #[error("invalid configuration: {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::Invalid`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors that prevent an engine from being built.
#[derive(Error, Debug)]
pub enum VigilError {
    /// Configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Two detectors registered under the same id.
    #[error("duplicate check id: {0}")]
    DuplicateCheck(&'static str),

    /// The disabled list names a check that is not registered.
    #[error("cannot disable unknown check: {0}")]
    UnknownCheck(String),
}

/// Result type for engine construction.
pub type VigilResult<T> = Result<T, VigilError>;
