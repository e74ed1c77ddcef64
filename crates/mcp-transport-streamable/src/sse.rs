//! Server-Sent Events encoding, pure and I/O-free.
//!
//! Grounded in `turbomcp_transport_streamable::sse::{SseEvent, SseEncoder}`,
//! trimmed to the `std`-only, non-`no_std` shape this crate needs — the
//! axum route handlers convert [`SseEvent`] into `axum::response::sse::Event`
//! at the point they're written to the wire.

/// One Server-Sent Event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub id: Option<String>,
    pub event: Option<String>,
    pub data: String,
}

impl SseEvent {
    /// A `message`-typed event carrying `data`, without an id (used for the
    /// synthetic endpoint-discovery event some MCP clients expect first).
    pub fn message(data: impl Into<String>) -> Self {
        Self {
            id: None,
            event: None,
            data: data.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }
}

/// Encodes [`SseEvent`]s to their wire text form and builds the keepalive
/// comment ping, per SPEC_FULL.md §11 ("SseEncoder::encode_keepalive is
/// adopted verbatim").
pub struct SseEncoder;

impl SseEncoder {
    /// `id: ...\nevent: ...\ndata: ...\n\n`, splitting `data` across multiple
    /// `data:` lines if it contains embedded newlines, per the SSE spec.
    pub fn encode_string(event: &SseEvent) -> String {
        let mut out = String::new();
        if let Some(id) = &event.id {
            out.push_str("id: ");
            out.push_str(id);
            out.push('\n');
        }
        if let Some(kind) = &event.event {
            out.push_str("event: ");
            out.push_str(kind);
            out.push('\n');
        }
        for line in event.data.split('\n') {
            out.push_str("data: ");
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
        out
    }

    /// An empty comment line, sent on the keepalive interval so
    /// intermediaries (load balancers, proxies) don't time out the
    /// long-lived GET connection while no real event is pending.
    pub fn encode_keepalive() -> String {
        ": keepalive\n\n".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_id_event_and_multiline_data() {
        let event = SseEvent::message("line1\nline2").with_id("5").with_event("message");
        let encoded = SseEncoder::encode_string(&event);
        assert_eq!(encoded, "id: 5\nevent: message\ndata: line1\ndata: line2\n\n");
    }

    #[test]
    fn keepalive_is_a_comment_line() {
        assert_eq!(SseEncoder::encode_keepalive(), ": keepalive\n\n");
    }
}
