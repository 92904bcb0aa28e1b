//! # Governor Error Types
//!
//! Errors only surface while loading or validating configuration. The
//! per-frame operations of the governor, eviction policy and buffer pool
//! never fail; they degrade to a no-op or a conservative default.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while configuring the memory governor.
#[derive(Error, Debug)]
pub enum GovernorError {
    /// A config or probe file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The file that was being read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The TOML document could not be decoded.
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// A configuration invariant does not hold.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<toml::de::Error> for GovernorError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Result type for governor configuration operations.
pub type GovernorResult<T> = Result<T, GovernorError>;
