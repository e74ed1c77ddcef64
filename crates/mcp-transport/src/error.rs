//! Transport-level error taxonomy.
//!
//! Grounded in `turbomcp-transport-traits::error::TransportError`, trimmed
//! to the cases spec.md §7's "transport errors" bucket actually needs:
//! connect/send/receive failure, timeout, and a closed channel. Fancier
//! per-phase timeout variants (`ConnectionTimeout`, `RequestTimeout`, ...)
//! are a stdlib-HTTP-client concern that's out of scope per spec.md §1.

use thiserror::Error;

/// Specialized `Result` for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors a [`crate::traits::Transport`] implementation can raise.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// Failed to establish the underlying connection/pipe/socket.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// A previously established connection was lost.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// Writing a frame to the wire failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Reading a frame from the wire failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// An operation did not complete within its deadline.
    #[error("operation timed out")]
    Timeout,

    /// The transport was asked to perform an operation after being closed.
    #[error("transport is closed")]
    Closed,

    /// Message exceeded the transport's configured size limit.
    #[error("message of {size} bytes exceeds the {limit}-byte limit")]
    MessageTooLarge { size: usize, limit: usize },

    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
