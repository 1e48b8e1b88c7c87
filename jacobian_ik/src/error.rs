//! Recoverable errors of the IK crate.
//!
//! The solve path itself never fails: numerical degeneracies fall back to
//! zero contributions and a defective SVD is a fatal panic. These errors
//! cover configuration and hierarchy misuse.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IkError {
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A bone id does not belong to the hierarchy.
    #[error("unknown bone: {0}")]
    UnknownBone(usize),

    /// A mode name or legacy mode code could not be parsed.
    #[error("unknown IK mode: {0}")]
    UnknownMode(String),

    /// A configuration file could not be decoded.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

impl IkError {
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, IkError>;
