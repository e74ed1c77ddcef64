//! Session-level error taxonomy: handshake/phase violations and
//! pending-registry failures, each convertible into a [`mcp_protocol::ProtocolError`]
//! at the boundary where a JSON-RPC error response must be produced.

use mcp_protocol::ProtocolError;

/// Errors raised by the session state machine and the pending registry.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// A request other than `initialize`/`ping` arrived before the
    /// handshake completed.
    #[error("session is not yet active: {0}")]
    NotInitialized(&'static str),

    /// `initialize` was called on a session that already completed the
    /// handshake.
    #[error("session already initialized")]
    AlreadyInitialized,

    /// No protocol version is common to both peers.
    #[error("no common protocol version for requested {requested}")]
    VersionMismatch { requested: String },

    /// The method's feature was not negotiated by the peer.
    #[error("capability not negotiated: {feature}")]
    CapabilityNotSupported { feature: String },

    /// The session has begun tearing down and rejects new work.
    #[error("session is terminating")]
    Terminating,

    /// A pending-registry operation referenced an id with no matching entry.
    #[error("no pending request for id {0}")]
    UnknownRequestId(String),
}

impl From<SessionError> for ProtocolError {
    fn from(err: SessionError) -> Self {
        match &err {
            SessionError::NotInitialized(_) => ProtocolError::not_initialized(),
            SessionError::AlreadyInitialized => {
                ProtocolError::invalid_request(err.to_string())
            }
            SessionError::VersionMismatch { requested } => {
                ProtocolError::protocol_version_mismatch(requested)
            }
            SessionError::CapabilityNotSupported { feature } => {
                ProtocolError::capability_not_supported(feature)
            }
            SessionError::Terminating => ProtocolError::invalid_request(err.to_string()),
            SessionError::UnknownRequestId(_) => ProtocolError::invalid_request(err.to_string()),
        }
    }
}
