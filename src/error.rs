//! Typed error definitions for cryptographic state-machine operations.
//!
//! NO PANICS on caller-reachable paths - every boundary violation in §7's
//! taxonomy is a typed, structured error. `verify` is the one exception:
//! a tag mismatch is an expected outcome for adversarial input and is
//! reported as `false`, never as an error.

use thiserror::Error;

/// Result type alias used by every fallible surface operation.
pub type Result<T> = std::result::Result<T, KeyforgeError>;

/// Taxonomy of boundary-violation errors (spec §7).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyforgeError {
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    #[error("invalid key length {actual}, expected one of {expected:?}")]
    InvalidKey {
        expected: Vec<usize>,
        actual: usize,
    },

    #[error("invalid nonce: {0}")]
    InvalidNonce(String),

    #[error("invalid size: expected at least {expected}, got {actual}")]
    InvalidSize { expected: usize, actual: usize },

    #[error("operation requires a prior `initialize` call")]
    NotInitialized,

    #[error("illegal operation: {0}")]
    IllegalOperation(String),

    #[error("limit exceeded: {0}")]
    MaxExceeded(String),

    #[error("entropy source read failed: {0}")]
    BadRead(String),

    #[error("resource not found: {0}")]
    NotFound(String),
}

impl KeyforgeError {
    pub(crate) fn invalid_param(msg: impl Into<String>) -> Self {
        Self::InvalidParam(msg.into())
    }

    pub(crate) fn illegal(msg: impl Into<String>) -> Self {
        Self::IllegalOperation(msg.into())
    }

    pub(crate) fn max_exceeded(msg: impl Into<String>) -> Self {
        Self::MaxExceeded(msg.into())
    }
}
