//! Newline-delimited JSON over stdin/stdout, or over a spawned child
//! process's piped stdio — the transport most MCP servers run over in
//! practice, per spec.md §4.7's note that stdio is covered by the generic
//! `Transport` trait rather than the streamable-HTTP adapter's own module.
//!
//! Grounded in `turbomcp-stdio::transport::StdioTransport`.

mod transport;

pub use transport::StdioTransport;
pub use mcp_transport::{Transport, TransportError, TransportMessage, TransportResult, TransportState, TransportType};
