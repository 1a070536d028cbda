use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("component id {0:?} cannot contain '.'")]
    InvalidIdentifier(String),

    #[error("unknown storage type tag: {0}")]
    UnknownTypeTag(String),
}
