//! Error handling for the HE session layer
//!
//! Every failure in this crate is fatal to the operation that raised it: there
//! is no retry, reconnection or partial success. Callers decide what to do with
//! the session afterwards.

use thiserror::Error;

/// HE session error
#[derive(Debug, Error)]
pub enum HeError {
    /// Caller broke a precondition (empty vector send, bad flooding width, ...).
    /// Signals a bug in the calling protocol, not an environmental fault.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Short read/write or dropped connection.
    #[error("channel failure: {0}")]
    Channel(#[from] std::io::Error),

    /// Received bytes do not parse as a key/ciphertext for this context.
    #[error("deserialization failure: {0}")]
    Deserialization(String),

    /// Parameter set rejected by validation.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Handle not held by this role, or already released at teardown.
    #[error("handle not available: {0}")]
    MissingHandle(&'static str),
}

impl From<bincode::Error> for HeError {
    fn from(err: bincode::Error) -> Self {
        Self::Deserialization(err.to_string())
    }
}

/// Result type for HE session operations
pub type Result<T> = std::result::Result<T, HeError>;

/// Create a `HeError::ProtocolViolation` with format string support
macro_rules! violation {
    ($($arg:tt)*) => {
        $crate::error::HeError::ProtocolViolation(format!($($arg)*))
    };
}

/// Create a `HeError::Deserialization` with format string support
macro_rules! malformed {
    ($($arg:tt)*) => {
        $crate::error::HeError::Deserialization(format!($($arg)*))
    };
}

pub(crate) use malformed;
pub(crate) use violation;
