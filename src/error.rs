use std::path::PathBuf;

use thiserror::Error;

/// Result type for seqprior operations
pub type Result<T> = std::result::Result<T, SeqPriorError>;

/// Main error type for the seqprior library
#[derive(Debug, Error)]
pub enum SeqPriorError {
    /// Invalid dimensions for an array operation
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// Invalid parameter value
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// Empty buffer or container
    #[error("Empty buffer: {0}")]
    EmptyBuffer(String),

    /// The experiment directory for this configuration is already taken
    #[error("log exists: {}", .0.display())]
    ExperimentExists(PathBuf),

    /// A tracker was updated with a name it does not track
    #[error("Unknown metric '{0}'")]
    UnknownMetric(String),

    /// The prior buffer init path exists but cannot be loaded
    #[error("invalid initial path for prior buffer: {}", .0.display())]
    InvalidPriorPath(PathBuf),

    /// Configuration parsing or introspection failed
    #[error("Config error: {0}")]
    Config(String),

    /// Log sink could not be created
    #[error("Logging error: {0}")]
    Logging(String),

    /// IO errors (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for SeqPriorError {
    fn from(err: bincode::Error) -> Self {
        SeqPriorError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for SeqPriorError {
    fn from(err: serde_json::Error) -> Self {
        SeqPriorError::Serialization(err.to_string())
    }
}

impl From<clap::Error> for SeqPriorError {
    fn from(err: clap::Error) -> Self {
        SeqPriorError::Config(err.to_string())
    }
}

// Helper functions for common error patterns
impl SeqPriorError {
    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        SeqPriorError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        SeqPriorError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
