//! Errors
//!
//! Custom error types used throughout the `driftwatch` crate.
use thiserror::Error;

/// Broad category of a [`DriftError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Shape or content of the provided data is unusable.
    InvalidInput,
    /// A configuration value is out of range or unrecognized.
    Configuration,
    /// An artifact could not be written or restored.
    Serialization,
}

/// Errors that can occur while fitting, scoring or persisting a detector.
#[derive(Debug, Error)]
pub enum DriftError {
    /// Data passed to a detector is empty, malformed or has the wrong dimensionality.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
    /// Invalid value parsing.
    #[error("Invalid value {0} passed for {1}, expected one of {2}.")]
    ParseString(String, String, String),
    /// Unable to build the worker pool.
    #[error("Unable to build thread pool: {0}")]
    ThreadPool(String),
    /// Unable to write detector to file.
    #[error("Unable to write detector: {0}")]
    UnableToWrite(String),
    /// Unable to read detector from file.
    #[error("Unable to read detector: {0}")]
    UnableToRead(String),
    /// Artifact was produced with a different format version.
    #[error("Artifact format version {found} is not supported, expected version {expected}.")]
    IncompatibleVersion { found: u32, expected: u32 },
}

impl DriftError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DriftError::InvalidInput(_) => ErrorKind::InvalidInput,
            DriftError::InvalidParameter(..) | DriftError::ParseString(..) | DriftError::ThreadPool(_) => {
                ErrorKind::Configuration
            }
            DriftError::UnableToWrite(_) | DriftError::UnableToRead(_) | DriftError::IncompatibleVersion { .. } => {
                ErrorKind::Serialization
            }
        }
    }
}
