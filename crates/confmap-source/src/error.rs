//! Configuration source error types.

use std::path::PathBuf;
use std::time::Duration;

use confmap_core::{DecodeError, SchemaErrors};
use thiserror::Error;

/// Errors that can occur while reading or watching a configuration source.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The named configuration does not exist in the source.
    #[error("configuration `{name}` not found")]
    NotFound {
        /// Configuration name.
        name: String,
    },

    /// Failed to read a configuration file.
    #[error("failed to read configuration file: {path}")]
    Read {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration text is not valid for its format.
    #[error("failed to parse {format} configuration `{name}`: {reason}")]
    Parse {
        /// Configuration name.
        name: String,
        /// Format name.
        format: &'static str,
        /// Parser message.
        reason: String,
    },

    /// No parser is available for the file's extension.
    #[error("unsupported configuration format: {path}")]
    UnsupportedFormat {
        /// Path to the file.
        path: PathBuf,
    },

    /// The target type cannot be decoded, or the data is not a mapping.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// No result within the allotted time.
    #[error("configuration `{name}` timed out after {after:?}")]
    Timeout {
        /// Configuration name.
        name: String,
        /// The timeout that elapsed.
        after: Duration,
    },

    /// The file watcher could not be set up.
    #[error("file watcher error: {message}")]
    Watch {
        /// Description of the failure.
        message: String,
    },

    /// The source has been shut down.
    #[error("configuration source closed")]
    Closed,
}

impl SourceError {
    /// Create a new not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Create a new read error.
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Create a new parse error.
    pub fn parse(name: impl Into<String>, format: &'static str, reason: impl ToString) -> Self {
        Self::Parse {
            name: name.into(),
            format,
            reason: reason.to_string(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout(name: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            name: name.into(),
            after,
        }
    }

    /// Create a new watcher error.
    pub fn watch(message: impl Into<String>) -> Self {
        Self::Watch {
            message: message.into(),
        }
    }

    /// Returns `true` for [`SourceError::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` when the target type itself is defective; retrying
    /// cannot succeed.
    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Decode(DecodeError::Schema(_)))
    }
}

impl From<SchemaErrors> for SourceError {
    fn from(errors: SchemaErrors) -> Self {
        Self::Decode(DecodeError::Schema(errors))
    }
}

/// Errors returned while waiting for a configuration change.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListenError {
    /// No change arrived within the timeout.
    #[error("no configuration change within {after:?}")]
    Timeout {
        /// The timeout that elapsed.
        after: Duration,
    },

    /// The reload loop has stopped; no further changes will arrive.
    #[error("configuration reload loop has stopped")]
    Closed,
}
