//! Shared transport enums: which kind of adapter is in use, and its
//! current connection state.
//!
//! Grounded in `turbomcp-transport-traits::types`, restricted to the three
//! wire protocols spec.md §6 names: stdio, streamable HTTP, and legacy SSE.

use std::fmt;

/// Which wire-level adapter a [`crate::traits::Transport`] implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportType {
    /// Newline-delimited JSON over stdin/stdout.
    Stdio,
    /// POST-with-optional-SSE-upgrade, GET long-lived SSE, DELETE teardown.
    StreamableHttp,
    /// The legacy GET-establishes-stream / separate-POST-endpoint shape.
    SseLegacy,
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::StreamableHttp => write!(f, "streamable_http"),
            Self::SseLegacy => write!(f, "sse_legacy"),
        }
    }
}

/// Connection lifecycle of a transport instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
    /// Terminal, unrecoverable state — e.g. SSE reconnect attempts exhausted.
    Failed { reason: String },
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Disconnecting => write!(f, "disconnecting"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_wire_names() {
        assert_eq!(TransportType::Stdio.to_string(), "stdio");
        assert_eq!(TransportType::StreamableHttp.to_string(), "streamable_http");
    }
}
