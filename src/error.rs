//! Error types for all fetch-kit operations.

use std::time::Duration;
use thiserror::Error;

/// Convenience result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type.
///
/// The request path distinguishes three failure classes with different
/// retry semantics:
///
/// - [`Error::ClientError`] (4xx): the caller's input was rejected. Terminal
///   on first occurrence, never retried.
/// - [`Error::ServerError`] (5xx or transport-level): transient. Retried up
///   to the configured bound, then surfaced verbatim.
/// - [`Error::Timeout`]: the configured duration elapsed before the call
///   settled. Terminal, never retried.
///
/// Cache storage failures (`BackendError`, `SerializationError`,
/// `DeserializationError`) are recovered inside the store and never reach
/// [`crate::store::CacheStore`] callers.
#[derive(Error, Debug)]
pub enum Error {
    /// The server rejected the request (4xx).
    #[error("{message}")]
    ClientError {
        status: u16,
        /// Symbolic error code from the structured error body, when present.
        code: Option<String>,
        message: String,
    },

    /// The server failed (5xx) or the request never reached it.
    /// `status` is `None` for transport-level failures.
    #[error("{message}")]
    ServerError {
        status: Option<u16>,
        message: String,
    },

    /// The call did not settle within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// A value could not be serialized for storage or transmission.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// A stored or received payload could not be decoded.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// A cache backend operation failed (I/O, quota).
    #[error("cache backend error: {0}")]
    BackendError(String),

    /// Invalid configuration supplied by the caller.
    #[error("invalid configuration: {0}")]
    ConfigError(String),
}

impl Error {
    /// Whether the retry loop may re-attempt after this failure.
    ///
    /// Only server-side and transport failures are transient; everything
    /// else is terminal on first occurrence.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ServerError { .. })
    }

    /// Numeric HTTP status, where one is known.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::ClientError { status, .. } => Some(*status),
            Error::ServerError { status, .. } => *status,
            _ => None,
        }
    }

    /// Symbolic error code from the server's structured error body.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Error::ClientError { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}
