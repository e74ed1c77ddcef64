//! Engine-level error taxonomy: failures raised by the dispatcher and
//! request engine that aren't already covered by `mcp_protocol::ProtocolError`
//! or `mcp_session::SessionError`.

use mcp_protocol::ProtocolError;
use mcp_session::SessionError;
use mcp_transport::TransportError;

/// Errors the request engine can surface to a caller of `call`/`batch`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    /// The call's deadline elapsed with no response.
    #[error("request timed out")]
    Timeout,

    /// The caller (or session teardown) cancelled the request before it resolved.
    #[error("request cancelled: {reason}")]
    Cancelled { reason: String },

    /// The peer returned a JSON-RPC error response.
    #[error("peer returned error {code}: {message}")]
    Remote {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// The method's feature was not negotiated with the peer; never reaches
    /// the wire.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The session rejected the call outright (wrong phase, terminating).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Encoding succeeded but the transport could not deliver the bytes.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// `batch` was called with no operations, or a batch including
    /// `initialize`.
    #[error("invalid batch: {0}")]
    InvalidBatch(String),

    /// The pending registry's continuation channel was dropped before a
    /// terminal outcome was recorded — only possible if the engine itself
    /// panicked mid-resolution.
    #[error("response channel closed unexpectedly")]
    ChannelClosed,
}
