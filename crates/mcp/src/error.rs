//! The facade's single error type, unifying the engine/session/protocol
//! errors a [`crate::Client`] or [`crate::Server`] call can surface.

use mcp_engine::EngineError;
use mcp_protocol::ProtocolError;
use mcp_session::SessionError;

#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("peer negotiated an unsupported protocol version: {0}")]
    UnsupportedVersion(String),

    #[error("result did not match the expected shape: {0}")]
    UnexpectedResult(#[from] serde_json::Error),

    #[error(transparent)]
    Supervisor(#[from] mcp_supervisor::SupervisorError),
}
