//! Error taxonomy for the session runtime.
//!
//! Every fallible public API in the `duplex-*` crates returns
//! `Result<T, RuntimeError>`. The taxonomy is intentionally flat: five
//! variants covering the five error kinds a caller of this runtime can
//! observe (see the design's error handling section), not a scheme of
//! per-domain status codes.

use thiserror::Error;

/// Errors surfaced synchronously to a caller of the Helper tree or the
/// transport layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// A caller invoked a `send_*` (or similar) method on a Helper that is
    /// already `ended`/`deleted`, or otherwise violated a state-machine
    /// precondition (double-end, unpause-when-not-paused would be a no-op
    /// rather than this, double-start of an already-present child, etc).
    #[error("invalid operation `{operation}`: {reason}")]
    InvalidOperation {
        operation: &'static str,
        reason: String,
    },

    /// A value read from the wire or handed to the runtime by the caller
    /// failed validation: a missing start event on a rehydrated Helper, a
    /// malformed envelope field, an unknown child id referenced by an
    /// `endX`.
    #[error("validation failed for `{field}`: {reason}")]
    Validation { field: &'static str, reason: String },

    /// Transport-level failure: connect timeout, socket error, or an empty
    /// token passed through after a failed refresh.
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// A remote-originated protocol error delivered for a Helper, surfaced
    /// as a Rust error instead of (or in addition to) the error sinks.
    #[error("protocol error {error_id}: {message}")]
    Protocol {
        error_id: String,
        message: String,
        code: Option<String>,
        details: Option<serde_json::Value>,
    },

    /// A historical snapshot fed to replay could not be turned into a
    /// valid envelope sequence.
    #[error("replay failed: {reason}")]
    Replay { reason: String },
}

impl RuntimeError {
    /// Helper-tree callers use this to decide whether retrying the
    /// operation that produced this error is ever worthwhile. Only
    /// [`RuntimeError::Network`] errors are retryable; every other variant
    /// reflects a programmer or data error that retrying will not fix.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RuntimeError::Network(_))
    }

    pub fn invalid_operation(operation: &'static str, reason: impl Into<String>) -> Self {
        RuntimeError::InvalidOperation {
            operation,
            reason: reason.into(),
        }
    }

    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        RuntimeError::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn replay(reason: impl Into<String>) -> Self {
        RuntimeError::Replay {
            reason: reason.into(),
        }
    }
}

/// Transport-specific failure modes, nested under [`RuntimeError::Network`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("connect attempt timed out after {timeout_ms}ms")]
    ConnectTimeout { timeout_ms: u64 },

    #[error("socket closed: {reason}")]
    SocketClosed { reason: String },

    #[error("no token could be obtained: {reason}")]
    TokenUnavailable { reason: String },
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[cfg(test)]
#[path = "lib.test.rs"]
mod tests;
