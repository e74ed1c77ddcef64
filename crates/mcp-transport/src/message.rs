//! The byte-level envelope transports exchange, one layer below JSON-RPC.
//!
//! Grounded in `turbomcp-transport-traits::message::TransportMessage`,
//! trimmed to what stdio and streamable-HTTP actually carry: a payload and
//! the bit of routing metadata the streamable-HTTP adapter needs (the
//! session id and, for SSE replay, the last event id).

use bytes::Bytes;

/// One frame's worth of bytes moving across a transport, in either
/// direction.
#[derive(Debug, Clone)]
pub struct TransportMessage {
    pub payload: Bytes,
    pub metadata: TransportMessageMetadata,
}

impl TransportMessage {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            metadata: TransportMessageMetadata::default(),
        }
    }

    pub fn with_metadata(payload: impl Into<Bytes>, metadata: TransportMessageMetadata) -> Self {
        Self {
            payload: payload.into(),
            metadata,
        }
    }

    pub fn size(&self) -> usize {
        self.payload.len()
    }
}

/// Routing metadata carried alongside a [`TransportMessage`], populated by
/// whichever adapter produced it.
#[derive(Debug, Clone, Default)]
pub struct TransportMessageMetadata {
    /// The `Mcp-Session-Id` this message belongs to, for streamable HTTP.
    pub session_id: Option<String>,
    /// The SSE event id this message was delivered/replayed under, if any.
    pub event_id: Option<String>,
}

impl TransportMessageMetadata {
    pub fn with_session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_reflects_payload_len() {
        let msg = TransportMessage::new(Bytes::from_static(b"hello"));
        assert_eq!(msg.size(), 5);
    }

    #[test]
    fn metadata_builder_sets_session_id() {
        let meta = TransportMessageMetadata::default().with_session_id("mcp-abc");
        assert_eq!(meta.session_id.as_deref(), Some("mcp-abc"));
    }
}
